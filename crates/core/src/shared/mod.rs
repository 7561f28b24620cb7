pub mod bounding_box;
pub mod clock;
pub mod color;
pub mod constants;
pub mod frame;

/// Boxed error returned across collaborator and detector seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
