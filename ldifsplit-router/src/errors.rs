use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("at least two filters are required to define a split, but only {0} provided")]
    NotEnoughFilters(usize),

    #[error("filter '{0}' appears more than once in the split definition")]
    DuplicateFilter(String),

    #[error("the split requires at least 2 sets, but {0} requested")]
    TooFewSets(u32),
}
