//! QR Token Issuer & Validator.
//!
//! A token is usable iff `now < expires_at AND NOT revoked`, and at most one
//! active token exists per schedule session. Validation and revocation are
//! serialized per token through single conditional UPDATEs against the backing
//! store, so a scan can never succeed with a token whose revoke has already
//! been accepted.

use chrono::{DateTime, Duration, Utc};
use db::models::qr_token::{self, ActiveModel, Column, Entity};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::error::ServiceError;
use crate::roster::RosterDirectory;

pub use db::models::qr_token::Model as QrToken;

pub struct TokenService;

impl TokenService {
    /// Issues a fresh time-boxed token for a schedule session.
    ///
    /// Fails when the session is unknown or has already concluded. The insert
    /// and the implicit revoke of any older active token run in one
    /// transaction, with the revoke scoped to ids below the new token's, so
    /// racing issuers always settle on the newest token as the only active
    /// one.
    pub async fn issue(
        db: &DatabaseConnection,
        roster: &dyn RosterDirectory,
        session_id: i64,
        ttl: Duration,
    ) -> Result<QrToken, ServiceError> {
        if ttl <= Duration::zero() {
            return Err(ServiceError::Validation(
                "token ttl must be positive".into(),
            ));
        }

        let session = roster
            .get_session(session_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("schedule session {session_id} not found")))?;

        let now = Utc::now();
        if session.has_concluded(now) {
            return Err(ServiceError::Validation(format!(
                "schedule session {session_id} has already concluded"
            )));
        }

        let txn = db.begin().await?;

        let token = ActiveModel {
            secret: Set(qr_token::generate_secret()),
            session_id: Set(session_id),
            issued_at: Set(now),
            expires_at: Set(now + ttl),
            revoked: Set(false),
            scan_count: Set(0),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // Implicit revoke of every still-active token older than the one just
        // inserted. Keying on the id instead of "all active" means two racing
        // issuers cannot revoke each other's fresh token.
        let revoked = Entity::update_many()
            .col_expr(Column::Revoked, Expr::value(true))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Id.lt(token.id))
            .filter(Column::Revoked.eq(false))
            .filter(Column::ExpiresAt.gt(now))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        if revoked.rows_affected > 0 {
            tracing::info!(
                session_id,
                count = revoked.rows_affected,
                "revoked prior active token(s) on reissue"
            );
        }

        tracing::info!(session_id, token_id = token.id, "issued attendance token");
        Ok(token)
    }

    /// Validates a presented secret and returns the bound session id.
    ///
    /// The usability check and the scan-count bump are one conditional UPDATE:
    /// zero rows affected means unusable, classified afterwards as NotFound,
    /// Expired or Revoked from a plain read.
    pub async fn validate(
        db: &DatabaseConnection,
        secret: &str,
    ) -> Result<i64, ServiceError> {
        let now = Utc::now();

        let res = Entity::update_many()
            .col_expr(
                Column::ScanCount,
                Expr::col(Column::ScanCount).add(1),
            )
            .filter(Column::Secret.eq(secret))
            .filter(Column::Revoked.eq(false))
            .filter(Column::ExpiresAt.gt(now))
            .exec(db)
            .await?;

        if res.rows_affected == 1 {
            let token = Self::find_by_secret(db, secret)
                .await?
                .ok_or_else(|| ServiceError::NotFound("attendance token not found".into()))?;
            return Ok(token.session_id);
        }

        match Self::find_by_secret(db, secret).await? {
            None => Err(ServiceError::NotFound("attendance token not found".into())),
            Some(token) if token.revoked => Err(ServiceError::Revoked),
            Some(_) => Err(ServiceError::Expired),
        }
    }

    /// Revokes a token by secret. Acks idempotently when the token is already
    /// revoked; only an unknown secret fails.
    pub async fn revoke(db: &DatabaseConnection, secret: &str) -> Result<QrToken, ServiceError> {
        let res = Entity::update_many()
            .col_expr(Column::Revoked, Expr::value(true))
            .filter(Column::Secret.eq(secret))
            .filter(Column::Revoked.eq(false))
            .exec(db)
            .await?;

        let token = Self::find_by_secret(db, secret)
            .await?
            .ok_or_else(|| ServiceError::NotFound("attendance token not found".into()))?;

        if res.rows_affected > 0 {
            tracing::info!(token_id = token.id, session_id = token.session_id, "token revoked");
        }
        Ok(token)
    }

    /// Deletes expired, never-revoked tokens that no caller queries any more.
    pub async fn purge_expired(
        db: &DatabaseConnection,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        let res = Entity::delete_many()
            .filter(Column::ExpiresAt.lt(cutoff))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    async fn find_by_secret(
        db: &DatabaseConnection,
        secret: &str,
    ) -> Result<Option<QrToken>, ServiceError> {
        Ok(Entity::find()
            .filter(Column::Secret.eq(secret))
            .one(db)
            .await?)
    }
}
