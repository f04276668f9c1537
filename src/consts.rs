// src/consts.rs
//! Shared constants: key parameters, table names and defaults

/// Length of every generated per-user key, in characters
pub const KEY_LENGTH: usize = 64;

/// Alphabet keys are drawn from (62 symbols)
pub const KEY_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of the random fragments mixed into the key seed
pub const SEED_FRAGMENT_LENGTH: usize = 11;

/// Hex characters of the BLAKE3 digest used to name a key in logs
pub const KEY_FINGERPRINT_HEX: usize = 16;

/// Prefix marking an AES-256-GCM envelope; v1 ciphertext is bare base64
pub const V2_ENVELOPE_PREFIX: &str = "v2:";

/// AES-GCM nonce size in bytes
pub const V2_NONCE_LEN: usize = 12;

/// Table holding journal entries
pub const ENTRIES_TABLE: &str = "entries";

/// Table holding pre-migration copies of entry payloads
pub const ENTRIES_BACKUP_TABLE: &str = "entries_backup";

/// Table holding one encryption key per user
pub const USER_KEYS_TABLE: &str = "user_encryption_keys";

/// Principal used by the CLI tools when none is configured or given
pub const DEFAULT_PRINCIPAL: &str = "00000000-0000-0000-0000-000000000000";

/// Default size of the all-users worker pool
pub const DEFAULT_WORKERS: usize = 4;

/// Default bind address of the relay server
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// Default downstream transcription endpoint
pub const DEFAULT_TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Default downstream transcription model
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Default downstream request timeout
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Largest request body the relay server accepts (audio uploads)
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
