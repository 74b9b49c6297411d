//! The SQL schema for all clinic tables.
//!
//! Applied once at startup; every statement is idempotent so restarting the
//! service against an existing database is a no-op. There is no migration
//! tooling beyond this.

use sqlx::PgPool;

use crate::Result;

const SCHEMA: &str = r#"
DO $$ BEGIN
    CREATE TYPE patient_status AS ENUM ('Active', 'Inactive');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;

DO $$ BEGIN
    CREATE TYPE appointment_status AS ENUM ('Scheduled', 'Completed', 'Canceled');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;

DO $$ BEGIN
    CREATE TYPE invoice_status AS ENUM ('OPEN', 'PARTIAL', 'PAID');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;

CREATE TABLE IF NOT EXISTS "staff" (
    "id" UUID PRIMARY KEY,
    "username" TEXT NOT NULL UNIQUE,
    "role" TEXT NOT NULL,
    "created_at" TIMESTAMPTZ NOT NULL,
    "updated_at" TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS "patient" (
    "id" UUID PRIMARY KEY,
    "name" TEXT NOT NULL,
    "dob" DATE NOT NULL,
    "chart_number" TEXT NOT NULL UNIQUE,
    "phone" TEXT NOT NULL,
    "address" TEXT,
    "status" patient_status NOT NULL DEFAULT 'Active',
    "created_at" TIMESTAMPTZ NOT NULL,
    "updated_at" TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS "appointment" (
    "id" UUID PRIMARY KEY,
    "staff_id" UUID NOT NULL REFERENCES "staff" ("id"),
    "patient_id" UUID NOT NULL REFERENCES "patient" ("id"),
    "date" DATE NOT NULL,
    "time" TIME NOT NULL,
    "status" appointment_status NOT NULL DEFAULT 'Scheduled',
    "visit_type" TEXT NOT NULL DEFAULT 'General Checkup',
    "reason" TEXT,
    "created_at" TIMESTAMPTZ NOT NULL,
    "updated_at" TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS "appointment_date_idx" ON "appointment" ("date");

-- Storage-level backstop for the check-then-insert race: two requests racing
-- for the same slot cannot both commit, whatever the in-process check saw.
-- Canceled rows are excluded so a canceled slot can be re-booked.
CREATE UNIQUE INDEX IF NOT EXISTS "appointment_provider_slot_idx"
    ON "appointment" ("staff_id", "date", "time") WHERE "status" <> 'Canceled';
CREATE UNIQUE INDEX IF NOT EXISTS "appointment_patient_slot_idx"
    ON "appointment" ("patient_id", "date", "time") WHERE "status" <> 'Canceled';

CREATE TABLE IF NOT EXISTS "invoice" (
    "id" UUID PRIMARY KEY,
    "patient_id" UUID NOT NULL REFERENCES "patient" ("id"),
    "date_issued" DATE NOT NULL,
    "status" invoice_status NOT NULL DEFAULT 'OPEN',
    "total_amount" NUMERIC(12, 2) NOT NULL,
    "paid_amount" NUMERIC(12, 2) NOT NULL DEFAULT 0,
    "created_at" TIMESTAMPTZ NOT NULL,
    "updated_at" TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS "invoice_patient_id_idx" ON "invoice" ("patient_id");

CREATE TABLE IF NOT EXISTS "invoice_item" (
    "id" UUID PRIMARY KEY,
    "invoice_id" UUID NOT NULL REFERENCES "invoice" ("id") ON DELETE CASCADE,
    "description" TEXT NOT NULL,
    "qty" INTEGER NOT NULL,
    "unit_price" NUMERIC(12, 2) NOT NULL
);

CREATE INDEX IF NOT EXISTS "invoice_item_invoice_id_idx" ON "invoice_item" ("invoice_id");

CREATE TABLE IF NOT EXISTS "payment" (
    "id" UUID PRIMARY KEY,
    "invoice_id" UUID NOT NULL REFERENCES "invoice" ("id"),
    "amount" NUMERIC(12, 2) NOT NULL,
    "method" TEXT,
    "reference" TEXT,
    "posted_at" TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS "payment_invoice_id_idx" ON "payment" ("invoice_id");
"#;

/// Creates all tables, enum types and indexes if they do not exist yet.
pub async fn ensure_schema(db: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(db).await?;
    Ok(())
}
