//! Trait comuni dei repository
//!
//! Users, chats and messages share the same three access shapes. Every
//! returned future is `Send`, so repository calls can run inside spawned
//! tasks and axum handlers alike. Implementations are free to write
//! `async fn`.

use std::future::Future;

/// Inserts a row built from `CreateDTO` and returns it with its database id.
pub trait Create<Entity, CreateDTO> {
    fn create(&self, data: &CreateDTO) -> impl Future<Output = Result<Entity, sqlx::Error>> + Send;
}

/// Looks a row up by primary key; `Ok(None)` when it does not exist.
pub trait Read<Entity, Id> {
    fn read(&self, id: &Id) -> impl Future<Output = Result<Option<Entity>, sqlx::Error>> + Send;
}

/// Partial update: only the `Some(_)` fields of `UpdateDTO` are written.
/// A missing row is `sqlx::Error::RowNotFound`.
pub trait Update<Entity, UpdateDTO, Id> {
    fn update(
        &self,
        id: &Id,
        data: &UpdateDTO,
    ) -> impl Future<Output = Result<Entity, sqlx::Error>> + Send;
}
