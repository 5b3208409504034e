//! Display geometry, timing policy and configuration builder

pub use crate::error::BuilderError;

/// Widest row the driver addresses
pub const MAX_COLUMNS: u8 = 20;

/// Most rows the driver addresses
pub const MAX_ROWS: u8 = 4;

/// Number of cells in the shadow buffer (4 rows x 20 columns)
pub const SHADOW_SIZE: usize = 80;

/// DDRAM address of column 0 for each row
///
/// Rows 2 and 3 continue rows 0 and 1 in the controller's address space,
/// which is why the table is not monotonic.
pub const ROW_DDRAM_BASE: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Shadow buffer index of column 0 for each row
///
/// Follows the controller's auto-increment order, so the buffer can be
/// replayed or read back with a single sequential DDRAM walk.
pub const ROW_BUFFER_OFFSET: [u8; 4] = [0, 40, 20, 60];

/// Character font
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Font {
    /// 5x8 dots
    #[default]
    Dots5x8,
    /// 5x10 dots
    ///
    /// Only honored on one-row displays; the controller cannot drive the
    /// taller font in two-line mode.
    Dots5x10,
}

/// Display geometry in character cells
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    /// Visible columns per row
    pub columns: u8,
    /// Visible rows
    pub rows: u8,
    /// Character font
    pub font: Font,
}

impl Geometry {
    /// Create a new geometry with validation
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidGeometry` if:
    /// - columns == 0 or columns > MAX_COLUMNS
    /// - rows == 0 or rows > MAX_ROWS
    pub fn new(columns: u8, rows: u8, font: Font) -> Result<Self, BuilderError> {
        if columns == 0 || columns > MAX_COLUMNS || rows == 0 || rows > MAX_ROWS {
            return Err(BuilderError::InvalidGeometry { columns, rows });
        }
        Ok(Self {
            columns,
            rows,
            font,
        })
    }

    /// Whether the controller runs in two-line mode
    pub fn is_multiline(&self) -> bool {
        self.rows > 1
    }

    /// Whether the 5x10 font is actually selected
    pub fn uses_tall_font(&self) -> bool {
        self.font == Font::Dots5x10 && self.rows == 1
    }
}

/// Bounded busy-flag polling policy
///
/// The controller is polled at most `max_attempts` times, `interval_us`
/// apart, before the wait is reported as timed out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BusyPolicy {
    /// Number of busy-flag reads before giving up (0 = a single read)
    pub max_attempts: u32,
    /// Delay between two reads in microseconds
    pub interval_us: u32,
}

impl BusyPolicy {
    /// Default number of polls
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 1_000;
    /// Default poll interval in microseconds
    pub const DEFAULT_INTERVAL_US: u32 = 100;
}

impl Default for BusyPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            interval_us: Self::DEFAULT_INTERVAL_US,
        }
    }
}

/// Driver configuration
///
/// Use `Builder` to create a Config.
#[derive(Clone, Debug)]
pub struct Config {
    /// Display geometry
    pub geometry: Geometry,
    /// Busy-flag polling policy
    pub busy_policy: BusyPolicy,
    /// Read back every DDRAM write and resynchronize on mismatch
    ///
    /// Only effective on transports that can read the bus.
    pub verify_writes: bool,
    /// Delay before the first instruction of the reset handshake
    pub power_on_delay_ms: u32,
    /// Delay between resynchronization and shadow replay
    pub resync_settle_ms: u32,
}

/// Builder for constructing driver configuration
///
/// # Example
///
/// ```
/// use hd44780_shadow::{Builder, BusyPolicy, Font, Geometry};
///
/// let geometry = match Geometry::new(20, 4, Font::Dots5x8) {
///     Ok(geometry) => geometry,
///     Err(_) => return,
/// };
/// let config = match Builder::new()
///     .geometry(geometry)
///     .busy_policy(BusyPolicy { max_attempts: 50, interval_us: 200 })
///     .build()
/// {
///     Ok(config) => config,
///     Err(_) => return,
/// };
/// assert!(config.verify_writes);
/// ```
#[must_use]
pub struct Builder {
    /// Display geometry (required)
    geometry: Option<Geometry>,
    /// Busy-flag polling policy
    busy_policy: BusyPolicy,
    /// Read back every DDRAM write
    verify_writes: bool,
    /// Delay before the reset handshake
    power_on_delay_ms: u32,
    /// Delay between resync and replay
    resync_settle_ms: u32,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            geometry: None,
            busy_policy: BusyPolicy::default(),
            verify_writes: true,
            // Datasheet: >40ms after Vcc rises to 2.7V
            power_on_delay_ms: 50,
            resync_settle_ms: 10,
        }
    }
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set display geometry (required)
    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Set the busy-flag polling policy
    pub fn busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.busy_policy = policy;
        self
    }

    /// Enable or disable write verification
    pub fn verify_writes(mut self, verify: bool) -> Self {
        self.verify_writes = verify;
        self
    }

    /// Set the power-on delay in milliseconds
    pub fn power_on_delay_ms(mut self, ms: u32) -> Self {
        self.power_on_delay_ms = ms;
        self
    }

    /// Set the settle delay between resync and replay in milliseconds
    pub fn resync_settle_ms(mut self, ms: u32) -> Self {
        self.resync_settle_ms = ms;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::MissingGeometry` if geometry was not set
    pub fn build(self) -> Result<Config, BuilderError> {
        Ok(Config {
            geometry: self.geometry.ok_or(BuilderError::MissingGeometry)?,
            busy_policy: self.busy_policy,
            verify_writes: self.verify_writes,
            power_on_delay_ms: self.power_on_delay_ms,
            resync_settle_ms: self.resync_settle_ms,
        })
    }
}
