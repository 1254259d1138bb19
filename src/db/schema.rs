//! SQL DDL for initializing the GRC store.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `id` INTEGER PRIMARY KEY AUTOINCREMENT on every entity table
/// - organisation-owned tables cascading on organisation delete
/// - enums stored as snake_case TEXT guarded by CHECK constraints
/// - timestamps stored as RFC3339 TEXT
///
/// Statements are split on `;` before execution, so no statement may
/// contain a literal semicolon.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS organizations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    industry TEXT NULL,
    risk_appetite INTEGER NOT NULL DEFAULT 12 CHECK (risk_appetite BETWEEN 1 AND 25),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    email TEXT NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'contributor'
        CHECK (role IN ('admin', 'manager', 'contributor', 'viewer')),
    created_at TEXT NOT NULL,
    UNIQUE (organization_id, email)
);

CREATE TABLE IF NOT EXISTS policies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    category TEXT NULL,
    content TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'draft'
        CHECK (status IN ('draft', 'in_review', 'approved', 'archived')),
    version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
    owner_id INTEGER NULL REFERENCES users(id) ON DELETE SET NULL,
    review_date TEXT NULL,
    approved_at TEXT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_policies_org ON policies(organization_id, status);

CREATE TABLE IF NOT EXISTS frameworks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    version TEXT NULL,
    description TEXT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS framework_domains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    framework_id INTEGER NOT NULL REFERENCES frameworks(id) ON DELETE CASCADE,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NULL,
    UNIQUE (framework_id, code)
);

CREATE TABLE IF NOT EXISTS controls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain_id INTEGER NOT NULL REFERENCES framework_domains(id) ON DELETE CASCADE,
    code TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NULL,
    implementation_status TEXT NOT NULL DEFAULT 'not_implemented'
        CHECK (implementation_status IN
            ('not_implemented', 'planned', 'partially_implemented', 'implemented', 'not_applicable')),
    owner_id INTEGER NULL REFERENCES users(id) ON DELETE SET NULL,
    UNIQUE (domain_id, code)
);

CREATE TABLE IF NOT EXISTS assessments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    framework_id INTEGER NOT NULL REFERENCES frameworks(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'in_progress' CHECK (status IN ('in_progress', 'completed')),
    score REAL NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT NULL
);

CREATE TABLE IF NOT EXISTS assessment_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    assessment_id INTEGER NOT NULL REFERENCES assessments(id) ON DELETE CASCADE,
    control_id INTEGER NOT NULL REFERENCES controls(id) ON DELETE CASCADE,
    status TEXT NOT NULL
        CHECK (status IN ('compliant', 'partially_compliant', 'non_compliant', 'not_applicable')),
    notes TEXT NULL,
    evidence TEXT NULL,
    assessed_at TEXT NOT NULL,
    UNIQUE (assessment_id, control_id)
);

CREATE TABLE IF NOT EXISTS risk_universe (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NULL
);

CREATE TABLE IF NOT EXISTS risks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    universe_id INTEGER NULL REFERENCES risk_universe(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    description TEXT NULL,
    category TEXT NULL,
    likelihood INTEGER NOT NULL CHECK (likelihood BETWEEN 1 AND 5),
    impact INTEGER NOT NULL CHECK (impact BETWEEN 1 AND 5),
    residual_likelihood INTEGER NULL CHECK (residual_likelihood BETWEEN 1 AND 5),
    residual_impact INTEGER NULL CHECK (residual_impact BETWEEN 1 AND 5),
    status TEXT NOT NULL DEFAULT 'identified'
        CHECK (status IN ('identified', 'assessed', 'mitigating', 'accepted', 'closed')),
    treatment TEXT NULL CHECK (treatment IN ('mitigate', 'transfer', 'avoid', 'accept')),
    owner_id INTEGER NULL REFERENCES users(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_risks_org ON risks(organization_id, status);

CREATE TABLE IF NOT EXISTS risk_controls (
    risk_id INTEGER NOT NULL REFERENCES risks(id) ON DELETE CASCADE,
    control_id INTEGER NOT NULL REFERENCES controls(id) ON DELETE CASCADE,
    PRIMARY KEY (risk_id, control_id)
);

CREATE TABLE IF NOT EXISTS business_processes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT NULL,
    owner_id INTEGER NULL REFERENCES users(id) ON DELETE SET NULL,
    criticality TEXT NOT NULL CHECK (criticality IN ('low', 'medium', 'high', 'critical')),
    rto_hours REAL NOT NULL CHECK (rto_hours > 0),
    rpo_hours REAL NOT NULL CHECK (rpo_hours >= 0),
    mtpd_hours REAL NULL CHECK (mtpd_hours > 0),
    hourly_downtime_cost REAL NOT NULL DEFAULT 0 CHECK (hourly_downtime_cost >= 0),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    asset_type TEXT NOT NULL
        CHECK (asset_type IN ('application', 'infrastructure', 'data', 'facility', 'people', 'supplier')),
    rto_hours REAL NULL CHECK (rto_hours > 0),
    rpo_hours REAL NULL CHECK (rpo_hours >= 0),
    hourly_cost REAL NOT NULL DEFAULT 0 CHECK (hourly_cost >= 0),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS process_dependencies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    process_id INTEGER NOT NULL REFERENCES business_processes(id) ON DELETE CASCADE,
    depends_on_process_id INTEGER NULL REFERENCES business_processes(id) ON DELETE CASCADE,
    depends_on_asset_id INTEGER NULL REFERENCES assets(id) ON DELETE CASCADE,
    notes TEXT NULL,
    CHECK ((depends_on_process_id IS NULL) <> (depends_on_asset_id IS NULL)),
    CHECK (depends_on_process_id IS NULL OR depends_on_process_id <> process_id)
);

-- NULLs are distinct in UNIQUE constraints, so each target kind gets its own partial index.
CREATE UNIQUE INDEX IF NOT EXISTS uq_dependencies_process
    ON process_dependencies(process_id, depends_on_process_id)
    WHERE depends_on_process_id IS NOT NULL;

CREATE UNIQUE INDEX IF NOT EXISTS uq_dependencies_asset
    ON process_dependencies(process_id, depends_on_asset_id)
    WHERE depends_on_asset_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS runbooks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    process_id INTEGER NULL REFERENCES business_processes(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    description TEXT NULL,
    status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'active', 'retired')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS runbook_steps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    runbook_id INTEGER NOT NULL REFERENCES runbooks(id) ON DELETE CASCADE,
    position INTEGER NOT NULL CHECK (position >= 1),
    title TEXT NOT NULL,
    description TEXT NULL,
    owner_role TEXT NULL,
    estimated_minutes INTEGER NOT NULL DEFAULT 0 CHECK (estimated_minutes >= 0),
    UNIQUE (runbook_id, position)
);
"#;
