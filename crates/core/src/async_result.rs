/// Lifecycle of one asynchronous fetch.
///
/// Exactly one variant is active at a time. Stores only move between variants
/// through [`start`](Self::start), [`succeed`](Self::succeed),
/// [`fail`](Self::fail) and [`reset`](Self::reset); a value is never shown
/// together with a loading flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AsyncResult<T, E> {
    /// No request issued yet.
    Empty,
    /// A request is in flight.
    Loading,
    Success(T),
    Error(E),
}

impl<T, E> Default for AsyncResult<T, E> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T, E> AsyncResult<T, E> {
    pub fn start(&mut self) {
        *self = Self::Loading;
    }

    pub fn succeed(&mut self, value: T) {
        *self = Self::Success(value);
    }

    pub fn fail(&mut self, error: E) {
        *self = Self::Error(error);
    }

    pub fn reset(&mut self) {
        *self = Self::Empty;
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns `true` once the request has either succeeded or failed.
    pub fn is_settled(&self) -> bool {
        self.is_success() || self.is_error()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> AsyncResult<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Empty => AsyncResult::Empty,
            Self::Loading => AsyncResult::Loading,
            Self::Success(value) => AsyncResult::Success(f(value)),
            Self::Error(error) => AsyncResult::Error(error),
        }
    }
}

impl<T, E> From<Result<T, E>> for AsyncResult<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Error(error),
        }
    }
}
