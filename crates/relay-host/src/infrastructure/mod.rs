//! Infrastructure layer: BLE link, input capture, shell seam, and config.

pub mod input_capture;
pub mod link;
pub mod shell_bridge;
pub mod storage;
