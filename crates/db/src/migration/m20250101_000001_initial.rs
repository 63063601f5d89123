//! Initial database migration.
//!
//! Creates the organization-scoped schema: users and memberships, the
//! distributor catalog, price history, recipes, and tier limits.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CORE TABLES
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(ORGANIZATIONS_SQL).await?;
        db.execute_unprepared(ORGANIZATION_USERS_SQL).await?;

        // ============================================================
        // PART 3: CATALOG
        // ============================================================
        db.execute_unprepared(DISTRIBUTORS_SQL).await?;
        db.execute_unprepared(COMMON_PRODUCTS_SQL).await?;
        db.execute_unprepared(DISTRIBUTOR_PRODUCTS_SQL).await?;
        db.execute_unprepared(PRICE_HISTORY_SQL).await?;

        // ============================================================
        // PART 4: RECIPES
        // ============================================================
        db.execute_unprepared(RECIPES_SQL).await?;
        db.execute_unprepared(RECIPE_INGREDIENTS_SQL).await?;

        // ============================================================
        // PART 5: SUBSCRIPTION & TIER MANAGEMENT
        // ============================================================
        db.execute_unprepared(TIER_LIMITS_SQL).await?;
        db.execute_unprepared(ORGANIZATION_USAGE_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        // ============================================================
        // PART 7: SEED DATA
        // ============================================================
        db.execute_unprepared(SEED_TIER_LIMITS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM ('owner', 'admin', 'manager', 'chef', 'viewer');

CREATE TYPE subscription_tier AS ENUM ('free', 'pro', 'enterprise');

CREATE TYPE subscription_status AS ENUM (
    'trialing',
    'active',
    'past_due',
    'cancelled'
);

CREATE TYPE price_source AS ENUM ('manual', 'import');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    full_name VARCHAR(255) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const ORGANIZATIONS_SQL: &str = r"
CREATE TABLE organizations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    slug VARCHAR(100) NOT NULL UNIQUE,
    currency CHAR(3) NOT NULL DEFAULT 'USD',
    timezone VARCHAR(50) NOT NULL DEFAULT 'UTC',
    settings JSONB NOT NULL DEFAULT '{}',
    is_active BOOLEAN NOT NULL DEFAULT true,

    subscription_tier subscription_tier NOT NULL DEFAULT 'free',
    subscription_status subscription_status NOT NULL DEFAULT 'trialing',
    trial_ends_at TIMESTAMPTZ,

    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_currency_format CHECK (currency ~ '^[A-Z]{3}$')
);
";

const ORGANIZATION_USERS_SQL: &str = r"
CREATE TABLE organization_users (
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    role user_role NOT NULL DEFAULT 'viewer',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (user_id, organization_id)
);

CREATE INDEX idx_org_users_org ON organization_users(organization_id);
";

const DISTRIBUTORS_SQL: &str = r"
CREATE TABLE distributors (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    contact_name VARCHAR(255),
    contact_email VARCHAR(255),
    contact_phone VARCHAR(50),
    account_number VARCHAR(100),
    notes TEXT,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_distributors_org_name UNIQUE (organization_id, name)
);
";

const COMMON_PRODUCTS_SQL: &str = r"
CREATE TABLE common_products (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    category VARCHAR(100),
    default_unit VARCHAR(20),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE UNIQUE INDEX uq_common_products_org_name ON common_products(organization_id, lower(name));
CREATE INDEX idx_common_products_org_category ON common_products(organization_id, category);
";

const DISTRIBUTOR_PRODUCTS_SQL: &str = r"
CREATE TABLE distributor_products (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    distributor_id UUID NOT NULL REFERENCES distributors(id),
    sku VARCHAR(100) NOT NULL,
    name VARCHAR(255) NOT NULL,
    brand VARCHAR(255),
    pack_description VARCHAR(100),
    pack_count INTEGER,
    unit_quantity NUMERIC(19, 6),
    unit VARCHAR(20),
    common_product_id UUID REFERENCES common_products(id) ON DELETE SET NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_distributor_products_sku UNIQUE (organization_id, distributor_id, sku),
    CONSTRAINT chk_pack_count_positive CHECK (pack_count IS NULL OR pack_count > 0),
    CONSTRAINT chk_unit_quantity_positive CHECK (unit_quantity IS NULL OR unit_quantity > 0)
);

CREATE INDEX idx_distributor_products_mapping ON distributor_products(common_product_id)
    WHERE common_product_id IS NOT NULL;
";

const PRICE_HISTORY_SQL: &str = r"
CREATE TABLE price_history (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    distributor_product_id UUID NOT NULL REFERENCES distributor_products(id) ON DELETE CASCADE,
    price NUMERIC(19, 4) NOT NULL,
    effective_date DATE NOT NULL,
    source price_source NOT NULL DEFAULT 'manual',
    created_by UUID REFERENCES users(id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_price_history_product_date UNIQUE (distributor_product_id, effective_date),
    CONSTRAINT chk_price_positive CHECK (price > 0)
);

CREATE INDEX idx_price_history_product_date
    ON price_history(distributor_product_id, effective_date DESC);
";

const RECIPES_SQL: &str = r"
CREATE TABLE recipes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    category VARCHAR(100),
    yield_quantity NUMERIC(19, 6),
    yield_unit VARCHAR(20),
    portions INTEGER,
    menu_price NUMERIC(19, 4),
    instructions TEXT,
    is_sub_recipe BOOLEAN NOT NULL DEFAULT false,
    created_by UUID REFERENCES users(id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_recipes_name UNIQUE (organization_id, name),
    CONSTRAINT chk_yield_positive CHECK (yield_quantity IS NULL OR yield_quantity > 0),
    CONSTRAINT chk_portions_positive CHECK (portions IS NULL OR portions > 0),
    CONSTRAINT chk_menu_price_positive CHECK (menu_price IS NULL OR menu_price > 0)
);
";

const RECIPE_INGREDIENTS_SQL: &str = r"
CREATE TABLE recipe_ingredients (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    recipe_id UUID NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    common_product_id UUID REFERENCES common_products(id),
    sub_recipe_id UUID REFERENCES recipes(id),
    free_text VARCHAR(500),
    quantity NUMERIC(19, 6),
    unit VARCHAR(20),
    notes VARCHAR(500),
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_exactly_one_source CHECK (
        num_nonnulls(common_product_id, sub_recipe_id, free_text) = 1
    ),
    CONSTRAINT chk_not_self_reference CHECK (sub_recipe_id IS NULL OR sub_recipe_id <> recipe_id),
    CONSTRAINT chk_quantity_positive CHECK (quantity IS NULL OR quantity > 0)
);

CREATE INDEX idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id, sort_order);
CREATE INDEX idx_recipe_ingredients_product ON recipe_ingredients(common_product_id)
    WHERE common_product_id IS NOT NULL;
CREATE INDEX idx_recipe_ingredients_sub_recipe ON recipe_ingredients(sub_recipe_id)
    WHERE sub_recipe_id IS NOT NULL;
";

const TIER_LIMITS_SQL: &str = r"
CREATE TABLE tier_limits (
    tier subscription_tier PRIMARY KEY,
    display_name VARCHAR(50) NOT NULL,
    max_outlets INTEGER,
    max_users INTEGER,
    max_recipes INTEGER,
    max_ai_parses_per_month INTEGER,
    has_ai_parser BOOLEAN NOT NULL DEFAULT false,
    has_price_import BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const ORGANIZATION_USAGE_SQL: &str = r"
CREATE TABLE organization_usage (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    year_month CHAR(7) NOT NULL,
    ai_parse_count INTEGER NOT NULL DEFAULT 0,
    price_import_count INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (organization_id, year_month)
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: set_updated_at
-- Keeps updated_at current on every UPDATE
-- ============================================================
CREATE OR REPLACE FUNCTION set_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_users_updated_at BEFORE UPDATE ON users
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_organizations_updated_at BEFORE UPDATE ON organizations
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_organization_users_updated_at BEFORE UPDATE ON organization_users
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_distributors_updated_at BEFORE UPDATE ON distributors
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_common_products_updated_at BEFORE UPDATE ON common_products
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_distributor_products_updated_at BEFORE UPDATE ON distributor_products
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_recipes_updated_at BEFORE UPDATE ON recipes
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_tier_limits_updated_at BEFORE UPDATE ON tier_limits
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
CREATE TRIGGER trg_organization_usage_updated_at BEFORE UPDATE ON organization_usage
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
";

const SEED_TIER_LIMITS_SQL: &str = r"
-- ============================================================
-- SEED: Subscription tier limits
-- NULL limits are unlimited
-- ============================================================
INSERT INTO tier_limits (
    tier, display_name,
    max_outlets, max_users, max_recipes, max_ai_parses_per_month,
    has_ai_parser, has_price_import
) VALUES
('free',       'Free',       1,    3,    50,   5,    true, false),
('pro',        'Pro',        5,    25,   NULL, 100,  true, true),
('enterprise', 'Enterprise', NULL, NULL, NULL, 1000, true, true)
ON CONFLICT (tier) DO NOTHING;
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================
DROP TABLE IF EXISTS organization_usage CASCADE;
DROP TABLE IF EXISTS tier_limits CASCADE;
DROP TABLE IF EXISTS recipe_ingredients CASCADE;
DROP TABLE IF EXISTS recipes CASCADE;
DROP TABLE IF EXISTS price_history CASCADE;
DROP TABLE IF EXISTS distributor_products CASCADE;
DROP TABLE IF EXISTS common_products CASCADE;
DROP TABLE IF EXISTS distributors CASCADE;
DROP TABLE IF EXISTS organization_users CASCADE;
DROP TABLE IF EXISTS organizations CASCADE;
DROP TABLE IF EXISTS users CASCADE;

DROP FUNCTION IF EXISTS set_updated_at();

DROP TYPE IF EXISTS price_source CASCADE;
DROP TYPE IF EXISTS subscription_status CASCADE;
DROP TYPE IF EXISTS subscription_tier CASCADE;
DROP TYPE IF EXISTS user_role CASCADE;
";
