use std::fs::File;
use std::path::PathBuf;

use crate::camera::domain::permission_gate::PermissionGate;

/// Grants camera access when the device node (or recorded stream) can be
/// opened for reading by the current user.
pub struct DevicePermissionGate {
    path: PathBuf,
}

impl DevicePermissionGate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PermissionGate for DevicePermissionGate {
    fn is_granted(&self) -> bool {
        match File::open(&self.path) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Camera access check failed for {}: {e}", self.path.display());
                false
            }
        }
    }
}
