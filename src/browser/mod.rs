pub mod chrome;
pub mod euipo;
pub mod wait;

pub use chrome::{ChromeDriver, ConnectionMode};
pub use euipo::EuipoPortal;
