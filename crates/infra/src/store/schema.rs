/// Idempotent DDL applied by [`super::PostgresStore::ensure_schema`], in order.
pub(super) const STATEMENTS: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id           BIGSERIAL PRIMARY KEY,
            inn          TEXT        NOT NULL DEFAULT '',
            username     TEXT        NOT NULL UNIQUE,
            password     TEXT        NOT NULL,
            company_name TEXT        NOT NULL DEFAULT '',
            is_admin     BOOLEAN     NOT NULL DEFAULT FALSE,
            is_active    BOOLEAN     NOT NULL DEFAULT TRUE,
            created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "fiscal_modules",
        r#"
        CREATE TABLE IF NOT EXISTS fiscal_modules (
            id             BIGSERIAL PRIMARY KEY,
            fiscal_number  TEXT        NOT NULL DEFAULT '',
            factory_number TEXT        NOT NULL UNIQUE,
            user_id        BIGINT      NOT NULL REFERENCES users (id) ON DELETE CASCADE,
            is_active      BOOLEAN     NOT NULL DEFAULT FALSE,
            created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "terminals",
        r#"
        CREATE TABLE IF NOT EXISTS terminals (
            id                      BIGSERIAL PRIMARY KEY,
            assembly_number         TEXT        NOT NULL DEFAULT '',
            inn                     TEXT        NOT NULL DEFAULT '',
            company_name            TEXT        NOT NULL DEFAULT '',
            address                 TEXT        NOT NULL DEFAULT '',
            cash_register_number    TEXT        NOT NULL,
            module_number           TEXT        NOT NULL DEFAULT '',
            last_request_date       TIMESTAMPTZ NULL,
            database_update_date    TIMESTAMPTZ NULL,
            is_active               BOOLEAN     NOT NULL DEFAULT TRUE,
            user_id                 BIGINT      NOT NULL REFERENCES users (id) ON DELETE CASCADE,
            free_record_balance     BIGINT      NOT NULL DEFAULT 0,
            status_changed_by_admin BOOLEAN     NOT NULL DEFAULT FALSE,
            created_at              TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at              TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "terminals_cash_register_number_idx",
        "CREATE INDEX IF NOT EXISTS terminals_cash_register_number_idx ON terminals (cash_register_number)",
    ),
    (
        "terminals_user_id_idx",
        "CREATE INDEX IF NOT EXISTS terminals_user_id_idx ON terminals (user_id)",
    ),
];
