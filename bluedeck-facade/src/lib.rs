/*!
 * BLUEDECK Bluetooth Control Facade
 * bluetoothctl status, paired devices, device info and connection toggling
 * Onyx Digital Intelligence Development LLC
 */

pub mod error;
pub mod facade;
pub mod parse;
pub mod runner;
pub mod version;

pub use error::{FacadeError, Result, VersionError};
pub use facade::DeviceFacade;
pub use runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner, DEFAULT_PROGRAM, DEFAULT_TIMEOUT};
pub use version::{parse_tool_version, select_paired_listing, PairedListing, ToolVersion};
