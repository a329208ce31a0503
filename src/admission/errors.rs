#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// The queued job was dropped before it produced a result
    #[error("Admitted job was abandoned before completing")]
    Abandoned,
}
