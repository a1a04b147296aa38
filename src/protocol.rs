//! Wire protocol constants: field tags, message opcodes, server error codes.
//!
//! The tag tables describe the self-describing binary format used for every
//! field inside a message: one tag byte followed by a payload whose length is
//! either implied by the tag or carried in a counted prefix. The opcode table
//! lists the request types understood by a Transaction Engine at protocol
//! version 11.

// ============================================================================
// Field tags
// ============================================================================

pub mod tag {
    pub const NULL: u8 = 1;
    pub const TRUE: u8 = 2;
    pub const FALSE: u8 = 3;

    /// Bare integer tags: tag 10 is -10, tag 20 is 0, tag 51 is 31.
    pub const INT_MINUS_10: u8 = 10;
    pub const INT_0: u8 = 20;
    pub const INT_31: u8 = 51;

    /// Counted integers: tag = INT_LEN_BASE + payload length (1..=8),
    /// payload is a sign-extended big-endian integer.
    pub const INT_LEN_BASE: u8 = 51;
    pub const INT_LEN_1: u8 = 52;
    pub const INT_LEN_8: u8 = 59;

    /// Scaled integers: tag = SCALED_BASE + payload length (0..=8),
    /// one scale byte precedes the payload.
    pub const SCALED_BASE: u8 = 60;
    pub const SCALED_MAX: u8 = 68;

    /// Counted strings: tag = UTF8_COUNT_BASE + length-prefix size (1..=4).
    pub const UTF8_COUNT_BASE: u8 = 68;
    pub const UTF8_COUNT_1: u8 = 69;
    pub const UTF8_COUNT_4: u8 = 72;

    /// Counted opaque byte strings, same shape as counted strings.
    pub const OPAQUE_COUNT_BASE: u8 = 72;
    pub const OPAQUE_COUNT_1: u8 = 73;
    pub const OPAQUE_COUNT_4: u8 = 76;

    /// Doubles: tag = DOUBLE_BASE + payload length (0..=8); the payload is a
    /// big-endian IEEE-754 double with trailing zero bytes stripped.
    pub const DOUBLE_BASE: u8 = 77;
    pub const DOUBLE_MAX: u8 = 85;

    /// Milliseconds since the Unix epoch, signed payload of 0..=8 bytes.
    pub const MSEC_BASE: u8 = 86;
    pub const MSEC_MAX: u8 = 94;

    /// Nanoseconds since the Unix epoch, signed payload of 0..=8 bytes.
    pub const NSEC_BASE: u8 = 95;
    pub const NSEC_MAX: u8 = 103;

    /// Milliseconds since midnight, signed payload of 0..=4 bytes.
    pub const TIME_BASE: u8 = 104;
    pub const TIME_MAX: u8 = 108;

    /// Inline strings: tag = UTF8_LEN_BASE + byte length (0..=39).
    pub const UTF8_LEN_BASE: u8 = 109;
    pub const UTF8_LEN_MAX: u8 = 148;

    /// Inline opaque byte strings: tag = OPAQUE_LEN_BASE + length (0..=39).
    pub const OPAQUE_LEN_BASE: u8 = 149;
    pub const OPAQUE_LEN_MAX: u8 = 188;

    /// Inline BLOB/CLOB: tag = base + length-prefix size (0..=4).
    pub const BLOB_BASE: u8 = 189;
    pub const BLOB_MAX: u8 = 193;
    pub const CLOB_BASE: u8 = 194;
    pub const CLOB_MAX: u8 = 198;

    /// Legacy fixed-point: one scale byte + 8-byte signed unscaled value.
    pub const SCALED_COUNT_1: u8 = 199;

    pub const UUID: u8 = 200;

    /// Scaled temporals: tag = base + ticks length (1..=8), one scale byte
    /// precedes the sign-extended ticks payload.
    pub const SCALED_DATE_BASE: u8 = 200;
    pub const SCALED_DATE_1: u8 = 201;
    pub const SCALED_DATE_8: u8 = 208;
    pub const SCALED_TIME_BASE: u8 = 208;
    pub const SCALED_TIME_1: u8 = 209;
    pub const SCALED_TIME_8: u8 = 216;
    pub const SCALED_TIMESTAMP_BASE: u8 = 216;
    pub const SCALED_TIMESTAMP_1: u8 = 217;
    pub const SCALED_TIMESTAMP_8: u8 = 224;

    /// Alternate fixed-point encoding, same payload shape as SCALED_COUNT_1.
    pub const SCALED_COUNT_2: u8 = 225;
}

// ============================================================================
// Message opcodes
// ============================================================================

/// Request opcodes, sent as the first (tagged, unsigned) integer of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum Opcode {
    Failure = 0,
    OpenDatabase = 3,
    Close = 5,
    PrepareTransaction = 6,
    CommitTransaction = 7,
    RollbackTransaction = 8,
    Prepare = 9,
    Create = 11,
    GetResultSet = 13,
    CloseStatement = 15,
    Execute = 18,
    ExecuteQuery = 19,
    ExecuteUpdate = 20,
    ExecutePreparedStatement = 22,
    ExecutePreparedQuery = 23,
    ExecutePreparedUpdate = 24,
    GetMetadata = 26,
    Next = 27,
    CloseResultSet = 28,
    Ping = 48,
    GetAutoCommit = 59,
    SetAutoCommit = 60,
    IsReadOnly = 61,
    SetReadOnly = 62,
    GetTransactionIsolation = 63,
    SetTransactionIsolation = 64,
    ExecuteBatch = 83,
    ExecuteBatchPreparedStatement = 84,
    GetParameterMetadata = 85,
    Authentication = 86,
    GetGeneratedKeys = 87,
    PrepareKeys = 88,
    PrepareKeyNames = 89,
    PrepareKeyIds = 90,
    SetSavePoint = 97,
    ReleaseSavePoint = 98,
    RollbackToSavePoint = 99,
    SupportsTransactionIsolation = 100,
    GetCatalog = 101,
    GetCurrentSchema = 102,
    SetQueryTimeout = 105,
    AuthorizeTypesRequest = 122,
    SetResultSetFetchSize = 123,
    SetStatementFetchSize = 124,
}

impl Opcode {
    #[inline]
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

// ============================================================================
// Protocol versions
// ============================================================================

/// Highest protocol version this client speaks.
pub const CURRENT_PROTOCOL_VERSION: i64 = 11;

/// Plaintext string carried by the Authentication frame; the server proving
/// it can decrypt this completes mutual key agreement.
pub const AUTH_TEST_STR: &str = "Success!";

/// Default TE port.
pub const DEFAULT_PORT: u16 = 48004;

// ============================================================================
// Server error codes
// ============================================================================

pub const SYNTAX_ERROR: i32 = -1;
pub const FEATURE_NOT_YET_IMPLEMENTED: i32 = -2;
pub const BUG_CHECK: i32 = -3;
pub const COMPILE_ERROR: i32 = -4;
pub const RUNTIME_ERROR: i32 = -5;
pub const OCS_ERROR: i32 = -6;
pub const NETWORK_ERROR: i32 = -7;
pub const CONVERSION_ERROR: i32 = -8;
pub const TRUNCATION_ERROR: i32 = -9;
pub const CONNECTION_ERROR: i32 = -10;
pub const DDL_ERROR: i32 = -11;
pub const APPLICATION_ERROR: i32 = -12;
pub const SECURITY_ERROR: i32 = -13;
pub const DATABASE_CORRUPTION: i32 = -14;
pub const VERSION_ERROR: i32 = -15;
pub const LICENSE_ERROR: i32 = -16;
pub const INTERNAL_ERROR: i32 = -17;
pub const DEBUG_ERROR: i32 = -18;
pub const LOST_BLOB: i32 = -19;
pub const INCONSISTENT_BLOB: i32 = -20;
pub const DELETED_BLOB: i32 = -21;
pub const LOG_ERROR: i32 = -22;
pub const DATABASE_DAMAGED: i32 = -23;
pub const UPDATE_CONFLICT: i32 = -24;
pub const NO_SUCH_TABLE: i32 = -25;
pub const INDEX_OVERFLOW: i32 = -26;
pub const UNIQUE_DUPLICATE: i32 = -27;
pub const UNCOMMITTED_UPDATES: i32 = -28;
pub const DEADLOCK: i32 = -29;
pub const OUT_OF_MEMORY_ERROR: i32 = -30;
pub const OUT_OF_RECORD_MEMORY_ERROR: i32 = -31;
pub const LOCK_TIMEOUT: i32 = -32;
pub const PLATFORM_ERROR: i32 = -36;
pub const NO_SCHEMA: i32 = -37;
pub const CONFIGURATION_ERROR: i32 = -38;
pub const READ_ONLY_ERROR: i32 = -39;
pub const NO_GENERATED_KEYS: i32 = -40;
pub const THROWN_EXCEPTION: i32 = -41;
pub const INVALID_TRANSACTION_ISOLATION: i32 = -42;
pub const UNSUPPORTED_TRANSACTION_ISOLATION: i32 = -43;
pub const INVALID_UTF8: i32 = -44;
pub const CONSTRAINT_ERROR: i32 = -45;
pub const UPDATE_ERROR: i32 = -46;
pub const I18N_ERROR: i32 = -47;
pub const OPERATION_KILLED: i32 = -48;
pub const INVALID_STATEMENT: i32 = -49;
pub const IS_SHUTDOWN: i32 = -50;
pub const IN_QUOTED_STRING: i32 = -51;
pub const BATCH_UPDATE_ERROR: i32 = -52;
pub const JAVA_ERROR: i32 = -53;
pub const INVALID_FIELD: i32 = -54;
pub const INVALID_INDEX_NULL: i32 = -55;
pub const INVALID_OPERATION: i32 = -56;
pub const INVALID_STATISTICS: i32 = -57;
pub const INVALID_GENERATOR: i32 = -58;
pub const OPERATION_TIMEOUT: i32 = -59;
pub const NO_SUCH_INDEX: i32 = -60;
pub const NO_SUCH_SEQUENCE: i32 = -61;
pub const XAER_PROTO: i32 = -62;
pub const UNKNOWN_ERROR: i32 = -63;
pub const TRANSACTIONAL_LOCK_ERROR: i32 = -64;
pub const TRANSACTION_UNKNOWN_STATE: i32 = -65;
pub const LOCK_NOT_GRANTED: i32 = -66;

/// Batch update count signalling a per-row failure; followed on the wire by
/// an error code and message for that row.
pub const BATCH_ROW_FAILED: i64 = -3;

/// Human-readable name for a server error code.
pub fn error_name(code: i32) -> &'static str {
    match code {
        SYNTAX_ERROR => "SYNTAX_ERROR",
        FEATURE_NOT_YET_IMPLEMENTED => "FEATURE_NOT_YET_IMPLEMENTED",
        BUG_CHECK => "BUG_CHECK",
        COMPILE_ERROR => "COMPILE_ERROR",
        RUNTIME_ERROR => "RUNTIME_ERROR",
        OCS_ERROR => "OCS_ERROR",
        NETWORK_ERROR => "NETWORK_ERROR",
        CONVERSION_ERROR => "CONVERSION_ERROR",
        TRUNCATION_ERROR => "TRUNCATION_ERROR",
        CONNECTION_ERROR => "CONNECTION_ERROR",
        DDL_ERROR => "DDL_ERROR",
        APPLICATION_ERROR => "APPLICATION_ERROR",
        SECURITY_ERROR => "SECURITY_ERROR",
        DATABASE_CORRUPTION => "DATABASE_CORRUPTION",
        VERSION_ERROR => "VERSION_ERROR",
        LICENSE_ERROR => "LICENSE_ERROR",
        INTERNAL_ERROR => "INTERNAL_ERROR",
        DEBUG_ERROR => "DEBUG_ERROR",
        LOST_BLOB => "LOST_BLOB",
        INCONSISTENT_BLOB => "INCONSISTENT_BLOB",
        DELETED_BLOB => "DELETED_BLOB",
        LOG_ERROR => "LOG_ERROR",
        DATABASE_DAMAGED => "DATABASE_DAMAGED",
        UPDATE_CONFLICT => "UPDATE_CONFLICT",
        NO_SUCH_TABLE => "NO_SUCH_TABLE",
        INDEX_OVERFLOW => "INDEX_OVERFLOW",
        UNIQUE_DUPLICATE => "UNIQUE_DUPLICATE",
        UNCOMMITTED_UPDATES => "UNCOMMITTED_UPDATES",
        DEADLOCK => "DEADLOCK",
        OUT_OF_MEMORY_ERROR => "OUT_OF_MEMORY_ERROR",
        OUT_OF_RECORD_MEMORY_ERROR => "OUT_OF_RECORD_MEMORY_ERROR",
        LOCK_TIMEOUT => "LOCK_TIMEOUT",
        PLATFORM_ERROR => "PLATFORM_ERROR",
        NO_SCHEMA => "NO_SCHEMA",
        CONFIGURATION_ERROR => "CONFIGURATION_ERROR",
        READ_ONLY_ERROR => "READ_ONLY_ERROR",
        NO_GENERATED_KEYS => "NO_GENERATED_KEYS",
        THROWN_EXCEPTION => "THROWN_EXCEPTION",
        INVALID_TRANSACTION_ISOLATION => "INVALID_TRANSACTION_ISOLATION",
        UNSUPPORTED_TRANSACTION_ISOLATION => "UNSUPPORTED_TRANSACTION_ISOLATION",
        INVALID_UTF8 => "INVALID_UTF8",
        CONSTRAINT_ERROR => "CONSTRAINT_ERROR",
        UPDATE_ERROR => "UPDATE_ERROR",
        I18N_ERROR => "I18N_ERROR",
        OPERATION_KILLED => "OPERATION_KILLED",
        INVALID_STATEMENT => "INVALID_STATEMENT",
        IS_SHUTDOWN => "IS_SHUTDOWN",
        IN_QUOTED_STRING => "IN_QUOTED_STRING",
        BATCH_UPDATE_ERROR => "BATCH_UPDATE_ERROR",
        JAVA_ERROR => "JAVA_ERROR",
        INVALID_FIELD => "INVALID_FIELD",
        INVALID_INDEX_NULL => "INVALID_INDEX_NULL",
        INVALID_OPERATION => "INVALID_OPERATION",
        INVALID_STATISTICS => "INVALID_STATISTICS",
        INVALID_GENERATOR => "INVALID_GENERATOR",
        OPERATION_TIMEOUT => "OPERATION_TIMEOUT",
        NO_SUCH_INDEX => "NO_SUCH_INDEX",
        NO_SUCH_SEQUENCE => "NO_SUCH_SEQUENCE",
        XAER_PROTO => "XAER_PROTO",
        UNKNOWN_ERROR => "UNKNOWN_ERROR",
        TRANSACTIONAL_LOCK_ERROR => "TRANSACTIONAL_LOCK_ERROR",
        TRANSACTION_UNKNOWN_STATE => "TRANSACTION_UNKNOWN_STATE",
        LOCK_NOT_GRANTED => "LOCK_NOT_GRANTED",
        _ => "[UNKNOWN ERROR CODE]",
    }
}
