//! Exit code constants for the tryon CLI.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `INPUT_FAILURE` | Asset could not be created, selected, or fetched |
//! | 10 | `GENERATION_TIMEOUT` | Provider call timed out |
//! | 70 | `PROVIDER_FAILURE` | Provider call failed or produced no image |

/// Exit codes matching the documented exit code table.
///
/// The numeric values are part of the public API.
///
/// ```rust
/// use tryon_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(70), ExitCode::PROVIDER_FAILURE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - unexpected failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Input failure - asset creation, selection, or remote fetch failed
    pub const INPUT_FAILURE: ExitCode = ExitCode(3);

    /// Generation timeout - the provider call exceeded its timeout
    pub const GENERATION_TIMEOUT: ExitCode = ExitCode(10);

    /// Provider failure - the provider call failed or returned no image
    pub const PROVIDER_FAILURE: ExitCode = ExitCode(70);

    /// Get the numeric exit code value
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an exit code from a raw integer
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
