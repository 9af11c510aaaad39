//! Fire-and-forget execution on `may` coroutines
//!
//! ```no_run
//! # use quarry::{Database, Entity};
//! # #[derive(Default, Entity)] pub struct User { pub id: i32, pub username: String }
//! # fn example(db: Database) {
//! db.query::<User>()
//!     .execute_list_async()
//!     .dispatch(
//!         |users| println!("{} users", users.len()),
//!         Some(Box::new(|err| eprintln!("query failed: {}", err))),
//!     );
//! # }
//! ```

use may::coroutine::JoinHandle;

use crate::error::{QuarryError, Result};

/// Callback receiving the failure of an [`AsyncTask`].
pub type ErrorCallback = Box<dyn FnOnce(QuarryError) + Send + 'static>;

/// An operation running on its own coroutine.
///
/// Either `wait` for its result or `dispatch` a continuation. A failure with
/// no error callback is logged and raised as a panic on the dispatching
/// coroutine, observable through the handle `dispatch` returns.
pub struct AsyncTask<T> {
    handle: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> AsyncTask<T> {
    pub fn spawn<F>(operation: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let handle = may::go!(move || operation());
        Self { handle }
    }

    /// Block the calling thread or coroutine until the operation finishes.
    ///
    /// A panic inside the operation is resumed on the caller.
    pub fn wait(self) -> Result<T> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Run `on_success` with the result, or `on_error` with the failure.
    pub fn dispatch<S>(self, on_success: S, on_error: Option<ErrorCallback>) -> JoinHandle<()>
    where
        S: FnOnce(T) + Send + 'static,
    {
        may::go!(move || match self.wait() {
            Ok(value) => on_success(value),
            Err(err) => match on_error {
                Some(callback) => callback(err),
                None => {
                    log::error!("unhandled failure in async task: {}", err);
                    panic!("unhandled failure in async task: {}", err);
                }
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crossbeam_channel::bounded;

    #[test]
    fn test_wait_returns_result() {
        let task = AsyncTask::spawn(|| Ok(21 * 2));
        assert_eq!(task.wait().unwrap(), 42);

        let task: AsyncTask<i32> = AsyncTask::spawn(|| Err(StoreError::new("down").into()));
        assert!(matches!(task.wait(), Err(QuarryError::Store(_))));
    }

    #[test]
    fn test_dispatch_success() {
        let (tx, rx) = bounded(1);
        let handle = AsyncTask::spawn(|| Ok("done".to_string())).dispatch(
            move |value| {
                let _ = tx.send(value);
            },
            None,
        );
        assert!(handle.join().is_ok());
        assert_eq!(rx.recv().unwrap(), "done");
    }

    #[test]
    fn test_dispatch_error_callback() {
        let (tx, rx) = bounded(1);
        let handle = AsyncTask::<()>::spawn(|| Err(StoreError::new("down").into())).dispatch(
            |_| panic!("success callback must not run"),
            Some(Box::new(move |err| {
                let _ = tx.send(err.to_string());
            })),
        );
        assert!(handle.join().is_ok());
        assert_eq!(rx.recv().unwrap(), "store error: down");
    }

    #[test]
    fn test_unhandled_failure_surfaces() {
        let handle = AsyncTask::<()>::spawn(|| Err(StoreError::new("down").into()))
            .dispatch(|_| {}, None);
        assert!(handle.join().is_err());
    }
}
