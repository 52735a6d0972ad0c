use slate_query::FilterParseError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    /// A caller-supplied input is malformed: key pattern, index spec,
    /// partial filter or hint.
    #[error("invalid query specification: {0}")]
    InvalidQuerySpecification(String),
}

impl PlannerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PlannerError::InvalidQuerySpecification(msg.into())
    }
}

impl From<FilterParseError> for PlannerError {
    fn from(e: FilterParseError) -> Self {
        PlannerError::InvalidQuerySpecification(e.to_string())
    }
}
