//! The asynchronous operations an adapter converts, and what each one does
//! with a failure nobody is waiting for.

use unichain_chain::{pending, Completer, Request, Unobserved};

/// An asynchronous chain operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Ready,
    Close,
    Get,
    Append,
    Update,
    Seek,
    Download,
    Has,
    Audit,
    DestroyStorage,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::Ready,
        Operation::Close,
        Operation::Get,
        Operation::Append,
        Operation::Update,
        Operation::Seek,
        Operation::Download,
        Operation::Has,
        Operation::Audit,
        Operation::DestroyStorage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Ready => "ready",
            Operation::Close => "close",
            Operation::Get => "get",
            Operation::Append => "append",
            Operation::Update => "update",
            Operation::Seek => "seek",
            Operation::Download => "download",
            Operation::Has => "has",
            Operation::Audit => "audit",
            Operation::DestroyStorage => "destroy_storage",
        }
    }

    /// Fire-and-continue operations drop unawaited failures silently.
    /// Reads and queries report them.
    pub fn unobserved(&self) -> Unobserved {
        match self {
            Operation::Get | Operation::Seek | Operation::Has | Operation::Audit => {
                Unobserved::Report
            }
            Operation::Ready
            | Operation::Close
            | Operation::Append
            | Operation::Update
            | Operation::Download
            | Operation::DestroyStorage => Unobserved::Silent,
        }
    }

    pub(crate) fn pending<T>(&self) -> (Completer<T>, Request<T>) {
        pending(self.name(), self.unobserved())
    }
}
