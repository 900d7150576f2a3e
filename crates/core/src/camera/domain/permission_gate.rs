/// Yes/no camera access check, consulted before every start attempt.
pub trait PermissionGate: Send {
    fn is_granted(&self) -> bool;
}
