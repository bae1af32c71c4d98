//! Composition root: builds every adapter and service from settings.
//!
//! Nothing here is a process-wide singleton. [`Backend::build`] returns a
//! fully wired value that the caller owns; storage is either process-local or
//! PostgreSQL, chosen by the caller.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;

use crate::domain::catalogue::{
    Discipline, Domain, MediaTrend, MediaType, OrderType, PaperType, ResearchCategory, Testimony,
};
use crate::domain::ports::{
    CredentialHasher, HashingError, Notifier, Repository, SearchIndex, TokenError,
};
use crate::domain::{
    AppLinks, AuthPorts, AuthService, CatalogueEntry, CatalogueField, CatalogueKind,
    CatalogueService, ChildReferences, CredentialHashingHook, Error, FieldListError, ParentLock,
    User, UserField, validate_field_lists,
};
use crate::outbound::credentials::Argon2CredentialHasher;
use crate::outbound::memory::{InMemoryRepository, InMemorySearchIndex};
use crate::outbound::persistence::{DbPool, DieselCatalogueRepository, DieselUserRepository};
use crate::outbound::tokens::JwtTokenService;
use crate::settings::{Settings, SettingsError};

/// Failures while wiring the backend.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Settings were missing or invalid.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// The hasher rejected its cost parameters.
    #[error("credential hasher: {0}")]
    Hashing(#[from] HashingError),
    /// The token service rejected its secret.
    #[error("token service: {0}")]
    Tokens(#[from] TokenError),
    /// A domain value (such as the app URL) was invalid.
    #[error(transparent)]
    Domain(#[from] Error),
    /// An entity's field lists are inconsistent.
    #[error(transparent)]
    FieldList(#[from] FieldListError),
}

fn validate_entities() -> Result<(), FieldListError> {
    validate_field_lists::<User>()?;
    validate_field_lists::<CatalogueEntry<ResearchCategory>>()?;
    validate_field_lists::<CatalogueEntry<Discipline>>()?;
    validate_field_lists::<CatalogueEntry<PaperType>>()?;
    validate_field_lists::<CatalogueEntry<MediaType>>()?;
    validate_field_lists::<CatalogueEntry<MediaTrend>>()?;
    validate_field_lists::<CatalogueEntry<Domain>>()?;
    validate_field_lists::<CatalogueEntry<OrderType>>()?;
    validate_field_lists::<CatalogueEntry<Testimony>>()
}

/// Where entities are stored.
#[derive(Clone)]
pub enum Storage {
    /// Process-local; lost on exit.
    Memory,
    /// PostgreSQL through the shared pool.
    Postgres(DbPool),
}

impl Storage {
    fn users(&self, clock: &Arc<dyn Clock>, hasher: &Arc<dyn CredentialHasher>) -> Arc<dyn Repository<User>> {
        let hook = Arc::new(CredentialHashingHook::new(Arc::clone(hasher)));
        match self {
            Self::Memory => Arc::new(
                InMemoryRepository::new(Arc::clone(clock))
                    .with_unique(&[UserField::Email])
                    .with_hook(hook),
            ),
            Self::Postgres(pool) => {
                Arc::new(DieselUserRepository::new(pool.clone(), Arc::clone(clock)).with_hook(hook))
            }
        }
    }

    fn catalogue<K: CatalogueKind>(
        &self,
        clock: &Arc<dyn Clock>,
    ) -> Arc<dyn Repository<CatalogueEntry<K>>> {
        match self {
            Self::Memory => {
                let scope = if K::PARENTED {
                    vec![CatalogueField::ResearchCategoryId, K::LABEL]
                } else {
                    vec![K::LABEL]
                };
                Arc::new(InMemoryRepository::new(Arc::clone(clock)).with_unique(&scope))
            }
            Self::Postgres(pool) => {
                Arc::new(DieselCatalogueRepository::<K>::new(pool.clone(), Arc::clone(clock)))
            }
        }
    }
}

/// One service per catalogue kind.
pub struct Catalogues {
    /// Research categories; deletes are refused while any child refers to one.
    pub research_categories: CatalogueService<ResearchCategory>,
    /// Disciplines.
    pub disciplines: CatalogueService<Discipline>,
    /// Paper types.
    pub paper_types: CatalogueService<PaperType>,
    /// Media types.
    pub media_types: CatalogueService<MediaType>,
    /// Media trends.
    pub media_trends: CatalogueService<MediaTrend>,
    /// Domains.
    pub domains: CatalogueService<Domain>,
    /// Order types.
    pub order_types: CatalogueService<OrderType>,
    /// Testimonies.
    pub testimonies: CatalogueService<Testimony>,
}

impl Catalogues {
    fn build(storage: &Storage, clock: &Arc<dyn Clock>, settings: &Settings) -> Result<Self, SettingsError> {
        let limits = settings.pagination.limits()?;
        let categories = storage.catalogue::<ResearchCategory>(clock);
        let disciplines = storage.catalogue::<Discipline>(clock);
        let paper_types = storage.catalogue::<PaperType>(clock);
        let media_types = storage.catalogue::<MediaType>(clock);
        let media_trends = storage.catalogue::<MediaTrend>(clock);
        let domains = storage.catalogue::<Domain>(clock);
        let lock = ParentLock::new();

        Ok(Self {
            research_categories: CatalogueService::new(Arc::clone(&categories))
                .with_relation(Arc::new(ChildReferences::new(Arc::clone(&disciplines))))
                .with_relation(Arc::new(ChildReferences::new(Arc::clone(&paper_types))))
                .with_relation(Arc::new(ChildReferences::new(Arc::clone(&media_types))))
                .with_relation(Arc::new(ChildReferences::new(Arc::clone(&media_trends))))
                .with_relation(Arc::new(ChildReferences::new(Arc::clone(&domains))))
                .with_parent_lock(lock.clone())
                .with_limits(limits),
            disciplines: parented(disciplines, &categories, &lock, limits),
            paper_types: parented(paper_types, &categories, &lock, limits),
            media_types: parented(media_types, &categories, &lock, limits),
            media_trends: parented(media_trends, &categories, &lock, limits),
            domains: parented(domains, &categories, &lock, limits),
            order_types: CatalogueService::new(storage.catalogue(clock)).with_limits(limits),
            testimonies: CatalogueService::new(storage.catalogue(clock)).with_limits(limits),
        })
    }
}

fn parented<K: CatalogueKind>(
    entries: Arc<dyn Repository<CatalogueEntry<K>>>,
    categories: &Arc<dyn Repository<CatalogueEntry<ResearchCategory>>>,
    lock: &ParentLock,
    limits: pagination::PaginationLimits,
) -> CatalogueService<K> {
    CatalogueService::new(entries)
        .with_categories(Arc::clone(categories))
        .with_parent_lock(lock.clone())
        .with_limits(limits)
}

/// Fully wired services.
pub struct Backend {
    /// Account lifecycle.
    pub auth: AuthService,
    /// Catalogue maintenance.
    pub catalogues: Catalogues,
}

impl Backend {
    /// Wire every adapter over `storage`.
    ///
    /// The search index is always process-local; call
    /// [`AuthService::reindex_search`] after building over persistent storage.
    pub fn build(
        mut settings: Settings,
        storage: &Storage,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BootstrapError> {
        validate_entities()?;
        let hasher: Arc<dyn CredentialHasher> =
            Arc::new(Argon2CredentialHasher::new(settings.hashing.cost())?);
        let secret = settings.auth.take_secret()?;
        let tokens = JwtTokenService::new(
            &secret,
            settings.auth.issuer(),
            settings.auth.token_lifetimes()?,
            Arc::clone(&clock),
        )?;
        let links = AppLinks::new(settings.auth.app_url())?;
        let search: Arc<dyn SearchIndex> = Arc::new(InMemorySearchIndex::new());

        let ports = AuthPorts {
            users: storage.users(&clock, &hasher),
            hasher,
            tokens: Arc::new(tokens),
            notifier,
            search,
            clock: Arc::clone(&clock),
        };
        let auth = AuthService::new(ports, links)
            .with_limits(settings.pagination.limits()?)
            .with_password_reset_ttl(settings.auth.password_reset_ttl()?);
        let catalogues = Catalogues::build(storage, &clock, &settings)?;
        info!(
            storage = match storage {
                Storage::Memory => "memory",
                Storage::Postgres(_) => "postgres",
            },
            "backend wired"
        );
        Ok(Self { auth, catalogues })
    }
}
