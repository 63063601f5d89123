//! Multi-outlet migration.
//!
//! Introduces outlets and moves distributor products, prices and recipes
//! from organization scope to outlet scope. Every existing organization gets
//! a `Main` outlet that inherits its data, and existing non-admin members are
//! assigned to it so nobody loses access.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: OUTLET TABLES
        // ============================================================
        db.execute_unprepared(OUTLETS_SQL).await?;
        db.execute_unprepared(USER_OUTLETS_SQL).await?;

        // ============================================================
        // PART 2: BACKFILL
        // ============================================================
        db.execute_unprepared(ADD_OUTLET_COLUMNS_SQL).await?;
        db.execute_unprepared(BACKFILL_SQL).await?;

        // ============================================================
        // PART 3: CONSTRAINTS
        // ============================================================
        db.execute_unprepared(ENFORCE_OUTLET_SQL).await?;
        db.execute_unprepared(RESCOPE_UNIQUES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        // Fails if two outlets hold the same SKU, recipe name or price date,
        // since organization scope cannot represent that.
        db.execute_unprepared(DOWN_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const OUTLETS_SQL: &str = r"
CREATE TABLE outlets (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    address TEXT,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_outlets_org_name UNIQUE (organization_id, name)
);

CREATE INDEX idx_outlets_org ON outlets(organization_id) WHERE is_active = true;

CREATE TRIGGER trg_outlets_updated_at BEFORE UPDATE ON outlets
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
";

const USER_OUTLETS_SQL: &str = r"
CREATE TABLE user_outlets (
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    outlet_id UUID NOT NULL REFERENCES outlets(id) ON DELETE CASCADE,
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (user_id, outlet_id)
);

CREATE INDEX idx_user_outlets_org_user ON user_outlets(organization_id, user_id);
";

const ADD_OUTLET_COLUMNS_SQL: &str = r"
ALTER TABLE distributor_products ADD COLUMN outlet_id UUID;
ALTER TABLE price_history ADD COLUMN outlet_id UUID;
ALTER TABLE recipes ADD COLUMN outlet_id UUID;
";

const BACKFILL_SQL: &str = r"
INSERT INTO outlets (organization_id, name)
SELECT id, 'Main' FROM organizations;

UPDATE distributor_products dp
SET outlet_id = o.id
FROM outlets o
WHERE o.organization_id = dp.organization_id AND o.name = 'Main';

UPDATE price_history ph
SET outlet_id = dp.outlet_id
FROM distributor_products dp
WHERE dp.id = ph.distributor_product_id;

UPDATE recipes r
SET outlet_id = o.id
FROM outlets o
WHERE o.organization_id = r.organization_id AND o.name = 'Main';

INSERT INTO user_outlets (user_id, outlet_id, organization_id)
SELECT ou.user_id, o.id, ou.organization_id
FROM organization_users ou
JOIN outlets o ON o.organization_id = ou.organization_id AND o.name = 'Main'
WHERE ou.role NOT IN ('owner', 'admin');
";

const ENFORCE_OUTLET_SQL: &str = r"
ALTER TABLE distributor_products
    ALTER COLUMN outlet_id SET NOT NULL,
    ADD CONSTRAINT fk_distributor_products_outlet
        FOREIGN KEY (outlet_id) REFERENCES outlets(id) ON DELETE CASCADE;

ALTER TABLE price_history
    ALTER COLUMN outlet_id SET NOT NULL,
    ADD CONSTRAINT fk_price_history_outlet
        FOREIGN KEY (outlet_id) REFERENCES outlets(id) ON DELETE CASCADE;

ALTER TABLE recipes
    ALTER COLUMN outlet_id SET NOT NULL,
    ADD CONSTRAINT fk_recipes_outlet
        FOREIGN KEY (outlet_id) REFERENCES outlets(id) ON DELETE CASCADE;

CREATE INDEX idx_distributor_products_outlet ON distributor_products(outlet_id, distributor_id);
CREATE INDEX idx_recipes_outlet ON recipes(outlet_id);
";

const RESCOPE_UNIQUES_SQL: &str = r"
ALTER TABLE price_history DROP CONSTRAINT uq_price_history_product_date;
ALTER TABLE price_history ADD CONSTRAINT uq_price_history_product_outlet_date
    UNIQUE (distributor_product_id, outlet_id, effective_date);

DROP INDEX IF EXISTS idx_price_history_product_date;
CREATE INDEX idx_price_history_outlet_product_date
    ON price_history(outlet_id, distributor_product_id, effective_date DESC);

ALTER TABLE distributor_products DROP CONSTRAINT uq_distributor_products_sku;
ALTER TABLE distributor_products ADD CONSTRAINT uq_distributor_products_outlet_sku
    UNIQUE (outlet_id, distributor_id, sku);

ALTER TABLE recipes DROP CONSTRAINT uq_recipes_name;
ALTER TABLE recipes ADD CONSTRAINT uq_recipes_outlet_name UNIQUE (outlet_id, name);
";

const DOWN_SQL: &str = r"
ALTER TABLE recipes DROP CONSTRAINT IF EXISTS uq_recipes_outlet_name;
ALTER TABLE recipes ADD CONSTRAINT uq_recipes_name UNIQUE (organization_id, name);

ALTER TABLE distributor_products DROP CONSTRAINT IF EXISTS uq_distributor_products_outlet_sku;
ALTER TABLE distributor_products ADD CONSTRAINT uq_distributor_products_sku
    UNIQUE (organization_id, distributor_id, sku);

DROP INDEX IF EXISTS idx_price_history_outlet_product_date;
ALTER TABLE price_history DROP CONSTRAINT IF EXISTS uq_price_history_product_outlet_date;
ALTER TABLE price_history ADD CONSTRAINT uq_price_history_product_date
    UNIQUE (distributor_product_id, effective_date);
CREATE INDEX idx_price_history_product_date
    ON price_history(distributor_product_id, effective_date DESC);

DROP INDEX IF EXISTS idx_recipes_outlet;
DROP INDEX IF EXISTS idx_distributor_products_outlet;

ALTER TABLE recipes DROP COLUMN IF EXISTS outlet_id;
ALTER TABLE price_history DROP COLUMN IF EXISTS outlet_id;
ALTER TABLE distributor_products DROP COLUMN IF EXISTS outlet_id;

DROP TABLE IF EXISTS user_outlets CASCADE;
DROP TABLE IF EXISTS outlets CASCADE;
";
