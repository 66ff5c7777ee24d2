/// Schema applied by [`DatabaseManager::migrate`](super::DatabaseManager::migrate).
///
/// Every statement is idempotent. Statements are separated by `;` and executed one by one.
pub const SQLITE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    username        TEXT NOT NULL UNIQUE,
    password_hash   TEXT,
    is_active       INTEGER NOT NULL DEFAULT 1,
    date_joined     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    id              BLOB PRIMARY KEY,
    user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at      TEXT NOT NULL,
    expires_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_user_id ON sessions(user_id);

CREATE TABLE IF NOT EXISTS address_users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS postal_addresses (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    address1        TEXT NOT NULL,
    address2        TEXT,
    zip_code        TEXT,
    city            TEXT,
    country         TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS unique_with_all
    ON postal_addresses(address1, address2, zip_code, city, country);

CREATE UNIQUE INDEX IF NOT EXISTS unique_without_address2
    ON postal_addresses(address1, zip_code, city, country)
    WHERE address2 IS NULL;

CREATE UNIQUE INDEX IF NOT EXISTS unique_without_zip_code
    ON postal_addresses(address1, address2, city, country)
    WHERE zip_code IS NULL;

CREATE UNIQUE INDEX IF NOT EXISTS unique_without_city
    ON postal_addresses(address1, address2, zip_code, country)
    WHERE city IS NULL;

CREATE UNIQUE INDEX IF NOT EXISTS unique_without_address2_zip_code
    ON postal_addresses(address1, city, country)
    WHERE address2 IS NULL AND zip_code IS NULL;

CREATE UNIQUE INDEX IF NOT EXISTS unique_without_address2_city
    ON postal_addresses(address1, zip_code, country)
    WHERE address2 IS NULL AND city IS NULL;

CREATE UNIQUE INDEX IF NOT EXISTS unique_without_zip_code_city
    ON postal_addresses(address1, address2, country)
    WHERE zip_code IS NULL AND city IS NULL;

CREATE UNIQUE INDEX IF NOT EXISTS unique_without_address2_zip_code_city
    ON postal_addresses(address1, country)
    WHERE address2 IS NULL AND zip_code IS NULL AND city IS NULL;

CREATE TABLE IF NOT EXISTS address_ownerships (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id        INTEGER NOT NULL REFERENCES address_users(id) ON DELETE CASCADE,
    address_id      INTEGER NOT NULL REFERENCES postal_addresses(id) ON DELETE CASCADE,
    UNIQUE (owner_id, address_id)
);

CREATE INDEX IF NOT EXISTS address_ownerships_address_id ON address_ownerships(address_id)
"#;
