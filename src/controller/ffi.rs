//! Control module linked from a foreign static library.
//!
//! The library exchanges data through the memory layout of [`super::marshal`] and reports log
//! lines through `robot_controller_log`.

use std::{slice, sync::Mutex};

use once_cell::sync::Lazy;

use super::{ControlModule, ControllerError, ExchangeMemory};

static LOG_LINES: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));

// Import of externally defined functions

extern "C" {
    fn robot_controller_create() -> i32;
    fn robot_controller_step(instance: i32, memory: *mut u8, len: usize) -> i32;
    fn robot_controller_destroy(instance: i32);
}

// Export of externally required functions

/// # Safety
///
/// `message` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn robot_controller_log(message: *const u8, len: usize) {
    if message.is_null() {
        return;
    }
    let bytes = slice::from_raw_parts(message, len);
    if let Ok(mut lines) = LOG_LINES.lock() {
        lines.push(String::from_utf8_lossy(bytes).into_owned());
    }
}

fn drain_log_lines() -> Vec<String> {
    LOG_LINES
        .lock()
        .map(|mut lines| lines.drain(..).collect())
        .unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct ForeignModule {
    instance: Option<i32>,
}

impl ForeignModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ControlModule for ForeignModule {
    fn instantiate(&mut self) -> Result<Vec<String>, ControllerError> {
        let instance = unsafe { robot_controller_create() };
        let logs = drain_log_lines();
        if instance < 0 {
            return Err(ControllerError::Module(format!(
                "instantiation failed with status {instance}"
            )));
        }
        self.instance = Some(instance);
        Ok(logs)
    }

    fn step(&mut self, memory: &mut ExchangeMemory) -> Result<Vec<String>, ControllerError> {
        let instance = self.instance.ok_or(ControllerError::NotInitialized)?;
        let bytes = memory.as_bytes_mut();
        let status = unsafe { robot_controller_step(instance, bytes.as_mut_ptr(), bytes.len()) };
        let logs = drain_log_lines();
        if status != 0 {
            return Err(ControllerError::Module(format!(
                "step failed with status {status}"
            )));
        }
        Ok(logs)
    }

    fn release(&mut self) {
        if let Some(instance) = self.instance.take() {
            unsafe { robot_controller_destroy(instance) };
        }
    }
}

impl Drop for ForeignModule {
    fn drop(&mut self) {
        self.release();
    }
}
