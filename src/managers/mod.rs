pub mod backup;
pub mod hooks;
pub mod logging;
pub mod tunnel;
