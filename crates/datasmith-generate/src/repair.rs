/// Outcome of a bounded generate-and-validate loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairResult<T, E> {
    /// The accepted candidate, or the last one tried on exhaustion.
    pub row: T,
    /// Candidates generated, between 1 and `max_attempts`.
    pub attempts: u32,
    /// Why the final candidate was rejected; `None` when it was accepted.
    pub rejection: Option<E>,
}

impl<T, E> RepairResult<T, E> {
    pub fn accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Regenerate a candidate until `check` accepts it or `max_attempts` is
/// reached. At least one candidate is always generated.
pub fn repair_row<T, E, G, C>(max_attempts: u32, mut generate: G, mut check: C) -> RepairResult<T, E>
where
    G: FnMut() -> T,
    C: FnMut(&T) -> Result<(), E>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        let row = generate();
        match check(&row) {
            Ok(()) => {
                return RepairResult {
                    row,
                    attempts,
                    rejection: None,
                };
            }
            Err(rejection) if attempts >= max_attempts => {
                return RepairResult {
                    row,
                    attempts,
                    rejection: Some(rejection),
                };
            }
            Err(_) => {}
        }
    }
}
