//! Pure-Rust NuoDB SQL client: the wire protocol engine.
//!
//! This crate opens an authenticated, enciphered session with a NuoDB
//! Transaction Engine over TCP, frames and encodes/decodes the tagged-byte
//! message format, and exposes a cursor-oriented database API.
//!
//! Architecture:
//! - `protocol`: tag tables, opcodes, and server error codes
//! - `codec`: tagged-field encoding/decoding
//! - `value`: driver-side SQL value model
//! - `srp` / `cipher`: SRP-6a key agreement and the session stream ciphers
//! - `stream`: length-framed, enciphered duplex byte stream
//! - `connection`: handshake, dispatcher, transaction and statement traffic
//! - `statement` / `cursor`: statement handles, result-set streaming, and
//!   the caller-facing cursor
//!
//! ```no_run
//! use nuodb::{Config, Connection, Value};
//!
//! # async fn example() -> nuodb::Result<()> {
//! let mut conn =
//!     Connection::connect_with_config(Config::new("te-host", "test", "dba", "goalie")).await?;
//! conn.set_auto_commit(true).await?;
//!
//! let mut cursor = conn.cursor();
//! cursor.execute("select id, name from users where id = ?", &[Value::Int(1)]).await?;
//! while let Some(row) = cursor.fetch_one().await? {
//!     println!("{:?}", row);
//! }
//! cursor.close().await?;
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod cipher;
pub mod codec;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod protocol;
pub mod srp;
pub mod statement;
pub mod stream;
pub mod value;


pub use cipher::CipherKind;
pub use connection::{Config, Connection, Options, TxnInfo};
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use statement::{
    BatchEntry, ColumnMetadata, ExecutionResult, GeneratedKeys, PreparedStatement, ResultSet,
    Statement,
};
pub use value::{Date, Decimal, Row, Time, Timestamp, Value};
