use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::schema::{Entity, EntitySchema, FilterField, TtlTier};
use super::types::{FieldKind, RecordId, TenantId};

pub const ALL_SCHEMAS: &[&EntitySchema] = &[
    BlogPost::SCHEMA,
    Project::SCHEMA,
    MusicTrack::SCHEMA,
    Technology::SCHEMA,
    Testimonial::SCHEMA,
    WorkExperience::SCHEMA,
    WorkMilestone::SCHEMA,
    PortfolioConfig::SCHEMA,
];

/// Look up a schema by its cache namespace.
pub fn schema_for(namespace: &str) -> Option<&'static EntitySchema> {
    ALL_SCHEMAS
        .iter()
        .copied()
        .find(|schema| schema.namespace == namespace)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub title: String,
    pub slug: String,
    pub extract: Option<String>,
    pub content: String,
    pub is_published: bool,
    pub language: String,
    pub category_id: Option<i64>,
    pub reading_time_minutes: Option<i32>,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const BLOG_POST_SCHEMA: EntitySchema = EntitySchema {
    namespace: "blog_post",
    table: "blog_posts",
    primary_key: "id",
    columns: &[
        "id",
        "tenant_id",
        "title",
        "slug",
        "extract",
        "content",
        "is_published",
        "language",
        "category_id",
        "reading_time_minutes",
        "published_at",
        "created_at",
        "updated_at",
    ],
    sortable: &["id", "title", "published_at", "created_at"],
    search_column: Some("title"),
    filters: &[
        FilterField::new("category_id", FieldKind::Int),
        FilterField::new("is_published", FieldKind::Bool),
        FilterField::new("language", FieldKind::Text),
    ],
    writable: &[
        "title",
        "slug",
        "extract",
        "content",
        "is_published",
        "language",
        "category_id",
        "reading_time_minutes",
        "published_at",
    ],
    list_ttl: TtlTier::Short,
    item_ttl: TtlTier::Medium,
};

impl Entity for BlogPost {
    const SCHEMA: &'static EntitySchema = &BLOG_POST_SCHEMA;

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub impact_summary: String,
    pub website_url: Option<String>,
    pub repo_url: Option<String>,
    pub status: String,
    pub language: String,
    pub sort_order: i32,
    pub is_featured: bool,
    pub is_visible: bool,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const PROJECT_SCHEMA: EntitySchema = EntitySchema {
    namespace: "project",
    table: "projects",
    primary_key: "id",
    columns: &[
        "id",
        "tenant_id",
        "title",
        "slug",
        "description",
        "impact_summary",
        "website_url",
        "repo_url",
        "status",
        "language",
        "sort_order",
        "is_featured",
        "is_visible",
        "start_date",
        "end_date",
        "created_at",
        "updated_at",
    ],
    sortable: &["id", "title", "sort_order", "start_date", "created_at"],
    search_column: Some("title"),
    filters: &[
        FilterField::new("is_featured", FieldKind::Bool),
        FilterField::new("is_visible", FieldKind::Bool),
        FilterField::new("status", FieldKind::Text),
        FilterField::new("language", FieldKind::Text),
    ],
    writable: &[
        "title",
        "slug",
        "description",
        "impact_summary",
        "website_url",
        "repo_url",
        "status",
        "language",
        "sort_order",
        "is_featured",
        "is_visible",
        "start_date",
        "end_date",
    ],
    list_ttl: TtlTier::Medium,
    item_ttl: TtlTier::Medium,
};

impl Entity for Project {
    const SCHEMA: &'static EntitySchema = &PROJECT_SCHEMA;

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MusicTrack {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub title: String,
    pub artist: String,
    pub audio_url: String,
    pub duration_seconds: Option<i32>,
    pub sort_order: i32,
    pub is_featured: bool,
    pub is_public: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const MUSIC_TRACK_SCHEMA: EntitySchema = EntitySchema {
    namespace: "music_track",
    table: "music_tracks",
    primary_key: "id",
    columns: &[
        "id",
        "tenant_id",
        "title",
        "artist",
        "audio_url",
        "duration_seconds",
        "sort_order",
        "is_featured",
        "is_public",
        "created_at",
        "updated_at",
    ],
    sortable: &["id", "title", "sort_order", "created_at"],
    search_column: Some("title"),
    filters: &[
        FilterField::new("is_featured", FieldKind::Bool),
        FilterField::new("is_public", FieldKind::Bool),
    ],
    writable: &[
        "title",
        "artist",
        "audio_url",
        "duration_seconds",
        "sort_order",
        "is_featured",
        "is_public",
    ],
    list_ttl: TtlTier::Medium,
    item_ttl: TtlTier::Medium,
};

impl Entity for MusicTrack {
    const SCHEMA: &'static EntitySchema = &MUSIC_TRACK_SCHEMA;

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Technology {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub name: String,
    pub category: String,
    pub icon: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const TECHNOLOGY_SCHEMA: EntitySchema = EntitySchema {
    namespace: "technology",
    table: "technologies",
    primary_key: "id",
    columns: &[
        "id",
        "tenant_id",
        "name",
        "category",
        "icon",
        "created_at",
        "updated_at",
    ],
    sortable: &["id", "name", "created_at"],
    search_column: Some("name"),
    filters: &[FilterField::new("category", FieldKind::Text)],
    writable: &["name", "category", "icon"],
    list_ttl: TtlTier::Long,
    item_ttl: TtlTier::Medium,
};

impl Entity for Technology {
    const SCHEMA: &'static EntitySchema = &TECHNOLOGY_SCHEMA;

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Testimonial {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub author_name: String,
    pub author_role: Option<String>,
    pub content: String,
    pub sort_order: i32,
    pub is_visible: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const TESTIMONIAL_SCHEMA: EntitySchema = EntitySchema {
    namespace: "testimonial",
    table: "testimonials",
    primary_key: "id",
    columns: &[
        "id",
        "tenant_id",
        "author_name",
        "author_role",
        "content",
        "sort_order",
        "is_visible",
        "created_at",
        "updated_at",
    ],
    sortable: &["id", "sort_order", "created_at"],
    search_column: Some("author_name"),
    filters: &[FilterField::new("is_visible", FieldKind::Bool)],
    writable: &[
        "author_name",
        "author_role",
        "content",
        "sort_order",
        "is_visible",
    ],
    list_ttl: TtlTier::Medium,
    item_ttl: TtlTier::Medium,
};

impl Entity for Testimonial {
    const SCHEMA: &'static EntitySchema = &TESTIMONIAL_SCHEMA;

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkExperience {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub company: String,
    pub position: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub language: String,
    pub sort_order: i32,
    pub is_current: bool,
    pub is_visible: bool,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const WORK_EXPERIENCE_SCHEMA: EntitySchema = EntitySchema {
    namespace: "work_experience",
    table: "work_experiences",
    primary_key: "id",
    columns: &[
        "id",
        "tenant_id",
        "company",
        "position",
        "description",
        "location",
        "language",
        "sort_order",
        "is_current",
        "is_visible",
        "start_date",
        "end_date",
        "created_at",
        "updated_at",
    ],
    sortable: &["id", "sort_order", "start_date", "created_at"],
    search_column: Some("position"),
    filters: &[
        FilterField::new("is_current", FieldKind::Bool),
        FilterField::new("is_visible", FieldKind::Bool),
        FilterField::new("language", FieldKind::Text),
    ],
    writable: &[
        "company",
        "position",
        "description",
        "location",
        "language",
        "sort_order",
        "is_current",
        "is_visible",
        "start_date",
        "end_date",
    ],
    list_ttl: TtlTier::Medium,
    item_ttl: TtlTier::Medium,
};

impl Entity for WorkExperience {
    const SCHEMA: &'static EntitySchema = &WORK_EXPERIENCE_SCHEMA;

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Career milestone rendered inside its work experience listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkMilestone {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub work_experience_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub milestone_date: Date,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const WORK_MILESTONE_SCHEMA: EntitySchema = EntitySchema {
    namespace: "work_milestone",
    table: "work_milestones",
    primary_key: "id",
    columns: &[
        "id",
        "tenant_id",
        "work_experience_id",
        "title",
        "description",
        "milestone_date",
        "created_at",
        "updated_at",
    ],
    sortable: &["id", "milestone_date", "created_at"],
    search_column: Some("title"),
    filters: &[FilterField::new("work_experience_id", FieldKind::Int)],
    writable: &[
        "work_experience_id",
        "title",
        "description",
        "milestone_date",
    ],
    list_ttl: TtlTier::Medium,
    item_ttl: TtlTier::Medium,
};

impl Entity for WorkMilestone {
    const SCHEMA: &'static EntitySchema = &WORK_MILESTONE_SCHEMA;

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// AI-assistant configuration profile of a portfolio site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PortfolioConfig {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub name: String,
    pub assistant_model: Option<String>,
    pub assistant_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const PORTFOLIO_CONFIG_SCHEMA: EntitySchema = EntitySchema {
    namespace: "portfolio_config",
    table: "portfolio_configs",
    primary_key: "id",
    columns: &[
        "id",
        "tenant_id",
        "name",
        "assistant_model",
        "assistant_prompt",
        "temperature",
        "is_active",
        "created_at",
        "updated_at",
    ],
    sortable: &["id", "name", "created_at"],
    search_column: Some("name"),
    filters: &[FilterField::new("is_active", FieldKind::Bool)],
    writable: &[
        "name",
        "assistant_model",
        "assistant_prompt",
        "temperature",
        "is_active",
    ],
    list_ttl: TtlTier::Long,
    item_ttl: TtlTier::Medium,
};

impl Entity for PortfolioConfig {
    const SCHEMA: &'static EntitySchema = &PORTFOLIO_CONFIG_SCHEMA;

    fn id(&self) -> RecordId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
