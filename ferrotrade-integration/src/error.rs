/// Marker for errors that can never succeed on retry, as opposed to transient
/// failures a caller may choose to retry.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}

impl<T> Unrecoverable for tokio::sync::mpsc::error::SendError<T> {
    fn is_unrecoverable(&self) -> bool {
        true
    }
}
