//! Orchestrator service
//!
//! Every list call consults the authorization scope once, turns it into a
//! store condition and pages through the store. Every single-resource call
//! checks access before any storage I/O.

use super::resources::{
    now, Catalog, CatalogRegistry, Certificate, CertificateRequest, TargetOfEvaluation,
    TargetOfEvaluationRequest,
};
use crate::authz::{AccessType, AuthorizationScope, AuthorizationStrategy, RequestContext};
use crate::database::{
    run_blocking, run_to_completion, Condition, DatabaseEngine, OrderBy, Resource, StoreSource,
};
use crate::error::{Error, Result};
use crate::pagination::{Page, PaginatedRequest, PaginationOpts, Paginator};
use std::sync::Arc;
use uuid::Uuid;

/// The orchestrator: targets of evaluation, certificates and catalogs
pub struct Orchestrator {
    db: Arc<DatabaseEngine>,
    authz: Arc<dyn AuthorizationStrategy>,
    paginator: Paginator,
    catalogs: CatalogRegistry,
}

impl Orchestrator {
    /// Create the service and make sure its tables exist
    pub fn new(
        db: Arc<DatabaseEngine>,
        authz: Arc<dyn AuthorizationStrategy>,
        opts: PaginationOpts,
        catalogs: CatalogRegistry,
    ) -> Result<Self> {
        db.migrate::<TargetOfEvaluation>()?;
        db.migrate::<Certificate>()?;

        Ok(Self {
            db,
            authz,
            paginator: Paginator::new(opts),
            catalogs,
        })
    }

    /// Storage engine
    pub fn db(&self) -> &Arc<DatabaseEngine> {
        &self.db
    }

    /// Create the default target of evaluation if no target exists yet
    pub fn create_default_target(&self) -> Result<Option<TargetOfEvaluation>> {
        if self.db.count::<TargetOfEvaluation>(&[])? > 0 {
            return Ok(None);
        }

        let target = TargetOfEvaluation::default_target();
        self.db.create(&target)?;
        tracing::info!(id = %target.id, "Created default target of evaluation");

        Ok(Some(target))
    }

    // ========================================================================
    // Shared paths
    // ========================================================================

    /// Page through a resource, restricted to `scope`
    ///
    /// The scope is fetched by the caller, once per list call.
    async fn list_scoped<R, Q>(
        &self,
        ctx: &RequestContext,
        scope: AuthorizationScope,
        req: &Q,
        mut conditions: Vec<Condition>,
    ) -> Result<Page<R>>
    where
        R: Resource,
        Q: PaginatedRequest + ?Sized,
    {
        if !scope.all {
            conditions.push(Condition::is_in(R::SCOPE_COLUMN, scope.ids));
        }

        let order = OrderBy::for_resource::<R>(req.order_by(), req.asc())?;
        let source = StoreSource::<R>::new(Arc::clone(&self.db), order, conditions)
            .with_deadline(ctx.deadline());

        self.paginator.paginate_request(req, &source).await
    }

    fn authorize(&self, ctx: &RequestContext, access: AccessType, target_id: &str) -> Result<()> {
        if self.authz.check_access(ctx, access, target_id) {
            Ok(())
        } else {
            tracing::debug!(%access, target_id, "Access denied");
            Err(Error::PermissionDenied)
        }
    }

    /// Read from the store, abandoned at the request deadline
    async fn with_db<T, F>(&self, ctx: &RequestContext, work: F) -> Result<T>
    where
        F: FnOnce(&DatabaseEngine) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        run_blocking(ctx.deadline(), move || work(db.as_ref())).await
    }

    /// Write to the store; once started, the write is always awaited
    async fn write_db<T, F>(&self, ctx: &RequestContext, work: F) -> Result<T>
    where
        F: FnOnce(&DatabaseEngine) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        run_to_completion(ctx.deadline(), move || work(db.as_ref())).await
    }

    // ========================================================================
    // Targets of Evaluation
    // ========================================================================

    /// Register a new target of evaluation
    ///
    /// Only callers with unrestricted scope may create targets.
    pub async fn create_target_of_evaluation(
        &self,
        ctx: &RequestContext,
        req: TargetOfEvaluationRequest,
    ) -> Result<TargetOfEvaluation> {
        req.validate()?;
        if !self.authz.allowed_resources(ctx).all {
            tracing::debug!("Access denied: creating targets requires unrestricted scope");
            return Err(Error::PermissionDenied);
        }

        let ts = now();
        let target = TargetOfEvaluation {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            description: req.description,
            target_type: req.target_type,
            created_at: ts,
            updated_at: ts,
        };

        let row = target.clone();
        self.write_db(ctx, move |db| db.create(&row)).await?;
        tracing::debug!(id = %target.id, "Created target of evaluation");

        Ok(target)
    }

    /// List the targets of evaluation visible to the caller
    pub async fn list_targets_of_evaluation<Q>(
        &self,
        ctx: &RequestContext,
        req: &Q,
    ) -> Result<Page<TargetOfEvaluation>>
    where
        Q: PaginatedRequest + ?Sized,
    {
        let scope = self.authz.allowed_resources(ctx);
        self.list_scoped(ctx, scope, req, Vec::new()).await
    }

    pub async fn get_target_of_evaluation(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<TargetOfEvaluation> {
        validate_id(id)?;
        self.authorize(ctx, AccessType::Read, id)?;

        let cond = vec![Condition::eq("id", id)];
        self.with_db(ctx, move |db| db.get(&cond)).await
    }

    pub async fn update_target_of_evaluation(
        &self,
        ctx: &RequestContext,
        id: &str,
        req: TargetOfEvaluationRequest,
    ) -> Result<TargetOfEvaluation> {
        validate_id(id)?;
        req.validate()?;
        self.authorize(ctx, AccessType::Update, id)?;

        let cond = vec![Condition::eq("id", id)];
        let updated = self
            .write_db(ctx, move |db| {
                let existing: TargetOfEvaluation = db.get(&cond)?;
                let updated = TargetOfEvaluation {
                    name: req.name,
                    description: req.description,
                    target_type: req.target_type,
                    updated_at: now(),
                    ..existing
                };
                db.save(&updated)?;
                Ok(updated)
            })
            .await?;

        tracing::debug!(id = %updated.id, "Updated target of evaluation");
        Ok(updated)
    }

    /// Remove a target of evaluation together with its certificates
    pub async fn remove_target_of_evaluation(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        validate_id(id)?;
        self.authorize(ctx, AccessType::Delete, id)?;

        let target_id = id.to_string();
        self.write_db(ctx, move |db| {
            db.delete_cascade::<TargetOfEvaluation, Certificate>(
                &[Condition::eq("id", target_id.as_str())],
                &[Condition::eq(Certificate::SCOPE_COLUMN, target_id.as_str())],
            )
        })
        .await?;

        tracing::debug!(id, "Removed target of evaluation");
        Ok(())
    }

    // ========================================================================
    // Certificates
    // ========================================================================

    pub async fn create_certificate(
        &self,
        ctx: &RequestContext,
        target_of_evaluation_id: &str,
        req: CertificateRequest,
    ) -> Result<Certificate> {
        validate_id(target_of_evaluation_id)?;
        req.validate()?;
        self.authorize(ctx, AccessType::Create, target_of_evaluation_id)?;

        let certificate =
            req.into_certificate(Uuid::new_v4().to_string(), target_of_evaluation_id.to_string());

        let row = certificate.clone();
        self.write_db(ctx, move |db| {
            // The owning target must exist
            db.get::<TargetOfEvaluation>(&[Condition::eq(
                "id",
                row.target_of_evaluation_id.as_str(),
            )])?;
            db.create(&row)
        })
        .await?;

        tracing::debug!(id = %certificate.id, "Created certificate");
        Ok(certificate)
    }

    /// List certificates visible to the caller, optionally of one target only
    ///
    /// Asking for a target outside the caller's scope is denied rather than
    /// answered with an empty page.
    pub async fn list_certificates<Q>(
        &self,
        ctx: &RequestContext,
        target_of_evaluation_id: Option<&str>,
        req: &Q,
    ) -> Result<Page<Certificate>>
    where
        Q: PaginatedRequest + ?Sized,
    {
        let scope = self.authz.allowed_resources(ctx);

        let mut conditions = Vec::new();
        if let Some(target_id) = target_of_evaluation_id {
            validate_id(target_id)?;
            if !scope.permits(target_id) {
                tracing::debug!(target_id, "Access denied: filter outside of allowed scope");
                return Err(Error::PermissionDenied);
            }
            conditions.push(Condition::eq(Certificate::SCOPE_COLUMN, target_id));
        }

        self.list_scoped(ctx, scope, req, conditions).await
    }

    pub async fn get_certificate(
        &self,
        ctx: &RequestContext,
        target_of_evaluation_id: &str,
        id: &str,
    ) -> Result<Certificate> {
        validate_id(target_of_evaluation_id)?;
        validate_id(id)?;
        self.authorize(ctx, AccessType::Read, target_of_evaluation_id)?;

        let cond = certificate_conditions(target_of_evaluation_id, id);
        self.with_db(ctx, move |db| db.get(&cond)).await
    }

    pub async fn update_certificate(
        &self,
        ctx: &RequestContext,
        target_of_evaluation_id: &str,
        id: &str,
        req: CertificateRequest,
    ) -> Result<Certificate> {
        validate_id(target_of_evaluation_id)?;
        validate_id(id)?;
        req.validate()?;
        self.authorize(ctx, AccessType::Update, target_of_evaluation_id)?;

        let cond = certificate_conditions(target_of_evaluation_id, id);
        let updated = self
            .write_db(ctx, move |db| {
                let existing: Certificate = db.get(&cond)?;
                let updated = req.into_certificate(existing.id, existing.target_of_evaluation_id);
                db.save(&updated)?;
                Ok(updated)
            })
            .await?;

        tracing::debug!(id = %updated.id, "Updated certificate");
        Ok(updated)
    }

    pub async fn remove_certificate(
        &self,
        ctx: &RequestContext,
        target_of_evaluation_id: &str,
        id: &str,
    ) -> Result<()> {
        validate_id(target_of_evaluation_id)?;
        validate_id(id)?;
        self.authorize(ctx, AccessType::Delete, target_of_evaluation_id)?;

        let cond = certificate_conditions(target_of_evaluation_id, id);
        self.write_db(ctx, move |db| db.delete::<Certificate>(&cond))
            .await?;

        tracing::debug!(id, "Removed certificate");
        Ok(())
    }

    // ========================================================================
    // Catalogs
    // ========================================================================

    /// List catalogs; they are not tenant scoped
    pub async fn list_catalogs<Q>(&self, req: &Q) -> Result<Page<Catalog>>
    where
        Q: PaginatedRequest + ?Sized,
    {
        let source = self.catalogs.source(req.order_by(), req.asc())?;
        self.paginator.paginate_request(req, &source).await
    }

    pub fn get_catalog(&self, id: &str) -> Result<Catalog> {
        self.catalogs
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("catalog"))
    }
}

fn validate_id(id: &str) -> Result<()> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| Error::invalid_argument(format!("invalid id: {id:?}")))
}

fn certificate_conditions(target_of_evaluation_id: &str, id: &str) -> Vec<Condition> {
    vec![
        Condition::eq("id", id),
        Condition::eq(Certificate::SCOPE_COLUMN, target_of_evaluation_id),
    ]
}
