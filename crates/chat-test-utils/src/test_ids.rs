//! Fixed identities for deterministic tests.

// Token policy
pub const TEST_ISSUER: &str = "https://chattest.b2clogin.com/00000000-0000-0000-0000-000000000001/v2.0/";
pub const TEST_AUDIENCE: &str = "00000000-0000-0000-0000-0000000000aa";
pub const TEST_SCOPE: &str = "Chat.chat";

// Emails
pub const ALLOWED_EMAIL: &str = "alice@example.com";
pub const SECOND_ALLOWED_EMAIL: &str = "bob@example.com";
pub const DISALLOWED_EMAIL: &str = "mallory@example.com";

// Subjects
pub const TEST_SUBJECT: &str = "00000000-0000-0000-0000-0000000000bb";
