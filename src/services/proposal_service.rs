//! Proposal service - persistence and lifecycle rules for proposals.
//!
//! Owner-side operations are always scoped by `api_key_id`; a proposal owned by
//! another key behaves exactly like one that does not exist. Archived proposals
//! are hidden from every read and write.

use uuid::Uuid;

use crate::auth::hasher::generate_secret;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::proposal::{
    CreateProposalRequest, Proposal, ProposalStatus, UpdateProposalRequest,
};

const COLUMNS: &str = "id, api_key_id, title, client_name, client_email, currency, total_cents, \
                       sections, status, share_token, created_at, updated_at";

/// Create a draft proposal owned by `api_key_id`.
///
/// # Process
///
/// 1. Validate the request
/// 2. Generate a random share token (64 hex characters)
/// 3. Insert with status `draft`
pub async fn create_proposal(
    pool: &DbPool,
    api_key_id: Uuid,
    request: CreateProposalRequest,
) -> Result<Proposal, AppError> {
    request.validate()?;

    let share_token = generate_secret();

    let proposal = sqlx::query_as::<_, Proposal>(&format!(
        r#"
        INSERT INTO proposals (
            api_key_id, title, client_name, client_email, currency, total_cents, sections, status, share_token
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft', $8)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(api_key_id)
    .bind(request.title.trim())
    .bind(request.client_name.trim())
    .bind(request.client_email)
    .bind(request.currency)
    .bind(request.total_cents)
    .bind(request.sections)
    .bind(share_token)
    .fetch_one(pool)
    .await?;

    Ok(proposal)
}

/// List the key's proposals, newest first.
pub async fn list_proposals(pool: &DbPool, api_key_id: Uuid) -> Result<Vec<Proposal>, AppError> {
    let proposals = sqlx::query_as::<_, Proposal>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM proposals
        WHERE api_key_id = $1 AND status <> 'archived'
        ORDER BY created_at DESC
        "#
    ))
    .bind(api_key_id)
    .fetch_all(pool)
    .await?;

    Ok(proposals)
}

pub async fn get_proposal(
    pool: &DbPool,
    api_key_id: Uuid,
    proposal_id: Uuid,
) -> Result<Proposal, AppError> {
    sqlx::query_as::<_, Proposal>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM proposals
        WHERE id = $1 AND api_key_id = $2 AND status <> 'archived'
        "#
    ))
    .bind(proposal_id)
    .bind(api_key_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::ProposalNotFound)
}

/// Apply a partial update. Absent fields keep their current values.
pub async fn update_proposal(
    pool: &DbPool,
    api_key_id: Uuid,
    proposal_id: Uuid,
    request: UpdateProposalRequest,
) -> Result<Proposal, AppError> {
    request.validate()?;

    sqlx::query_as::<_, Proposal>(&format!(
        r#"
        UPDATE proposals
        SET title = COALESCE($3, title),
            client_name = COALESCE($4, client_name),
            client_email = CASE WHEN $10 THEN $5 ELSE client_email END,
            currency = COALESCE($6, currency),
            total_cents = COALESCE($7, total_cents),
            sections = COALESCE($8, sections),
            status = COALESCE($9, status),
            updated_at = NOW()
        WHERE id = $1 AND api_key_id = $2 AND status <> 'archived'
        RETURNING {COLUMNS}
        "#
    ))
    .bind(proposal_id)
    .bind(api_key_id)
    .bind(request.title.as_deref().map(str::trim))
    .bind(request.client_name.as_deref().map(str::trim))
    .bind(request.client_email.clone().flatten())
    .bind(request.currency)
    .bind(request.total_cents)
    .bind(request.sections)
    .bind(request.status.map(ProposalStatus::as_str))
    .bind(request.client_email.is_some())
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::ProposalNotFound)
}

/// Archive a proposal (soft delete). The row and its usage history are kept.
pub async fn archive_proposal(
    pool: &DbPool,
    api_key_id: Uuid,
    proposal_id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE proposals
        SET status = 'archived', updated_at = NOW()
        WHERE id = $1 AND api_key_id = $2 AND status <> 'archived'
        "#,
    )
    .bind(proposal_id)
    .bind(api_key_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ProposalNotFound);
    }

    Ok(())
}

/// Look up a proposal for the public viewer.
///
/// Drafts and archived proposals are reported as not found.
pub async fn find_public(pool: &DbPool, share_token: &str) -> Result<Proposal, AppError> {
    let proposal = sqlx::query_as::<_, Proposal>(&format!(
        "SELECT {COLUMNS} FROM proposals WHERE share_token = $1"
    ))
    .bind(share_token)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::ProposalNotFound)?;

    ensure_public(proposal.status())?;

    Ok(proposal)
}

/// Accept a sent proposal through its share link.
pub async fn accept_public(pool: &DbPool, share_token: &str) -> Result<Proposal, AppError> {
    let current = find_public(pool, share_token).await?;
    ensure_acceptable(current.status())?;

    // Conditional on status so two concurrent accepts cannot both succeed
    sqlx::query_as::<_, Proposal>(&format!(
        r#"
        UPDATE proposals
        SET status = 'accepted', updated_at = NOW()
        WHERE id = $1 AND status = 'sent'
        RETURNING {COLUMNS}
        "#
    ))
    .bind(current.id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::InvalidState("Proposal is no longer open for acceptance".to_string()))
}

fn ensure_public(status: Option<ProposalStatus>) -> Result<(), AppError> {
    match status {
        Some(status) if status.is_public() => Ok(()),
        _ => Err(AppError::ProposalNotFound),
    }
}

fn ensure_acceptable(status: Option<ProposalStatus>) -> Result<(), AppError> {
    match status {
        Some(ProposalStatus::Sent) => Ok(()),
        Some(other) => Err(AppError::InvalidState(format!(
            "Proposal is {} and cannot be accepted",
            other.as_str()
        ))),
        None => Err(AppError::InvalidState(
            "Proposal cannot be accepted".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hasher::hash_secret;
    use crate::auth::store::PgCredentialStore;
    use serde_json::json;

    #[test]
    fn drafts_and_archived_are_not_public() {
        assert!(matches!(
            ensure_public(Some(ProposalStatus::Draft)),
            Err(AppError::ProposalNotFound)
        ));
        assert!(matches!(
            ensure_public(Some(ProposalStatus::Archived)),
            Err(AppError::ProposalNotFound)
        ));
        assert!(matches!(ensure_public(None), Err(AppError::ProposalNotFound)));
        assert!(ensure_public(Some(ProposalStatus::Sent)).is_ok());
        assert!(ensure_public(Some(ProposalStatus::Declined)).is_ok());
    }

    #[test]
    fn only_sent_proposals_can_be_accepted() {
        assert!(ensure_acceptable(Some(ProposalStatus::Sent)).is_ok());

        for status in [ProposalStatus::Accepted, ProposalStatus::Declined] {
            match ensure_acceptable(Some(status)) {
                Err(AppError::InvalidState(msg)) => assert!(msg.contains(status.as_str())),
                other => panic!("expected conflict, got {other:?}"),
            }
        }
    }

    #[test]
    fn select_columns_match_model() {
        assert_eq!(COLUMNS.split(',').count(), 12);
        assert!(COLUMNS.contains("share_token"));
    }

    async fn new_key(pool: &DbPool, name: &str) -> Uuid {
        PgCredentialStore::new(pool.clone())
            .insert(name, &hash_secret(&generate_secret()))
            .await
            .unwrap()
            .id
    }

    fn draft(title: &str) -> CreateProposalRequest {
        serde_json::from_value(json!({
            "title": title,
            "client_name": "Globex",
            "client_email": "cto@globex.example",
            "total_cents": 500000
        }))
        .unwrap()
    }

    async fn set_status(pool: &DbPool, owner: Uuid, id: Uuid, status: ProposalStatus) -> Proposal {
        let request = UpdateProposalRequest {
            status: Some(status),
            ..Default::default()
        };
        update_proposal(pool, owner, id, request).await.unwrap()
    }

    #[sqlx::test]
    async fn create_starts_as_draft(pool: DbPool) {
        let owner = new_key(&pool, "Acme").await;

        let proposal = create_proposal(&pool, owner, draft("  Redesign  ")).await.unwrap();

        assert_eq!(proposal.api_key_id, owner);
        assert_eq!(proposal.title, "Redesign");
        assert_eq!(proposal.status(), Some(ProposalStatus::Draft));
        assert_eq!(proposal.share_token.len(), 64);
        assert_eq!(proposal.sections, json!([]));
    }

    #[sqlx::test]
    async fn other_keys_see_proposal_as_missing(pool: DbPool) {
        let owner = new_key(&pool, "Acme").await;
        let stranger = new_key(&pool, "Initech").await;
        let proposal = create_proposal(&pool, owner, draft("Redesign")).await.unwrap();

        assert!(matches!(
            get_proposal(&pool, stranger, proposal.id).await,
            Err(AppError::ProposalNotFound)
        ));
        let patch = UpdateProposalRequest {
            title: Some("Hijacked".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_proposal(&pool, stranger, proposal.id, patch).await,
            Err(AppError::ProposalNotFound)
        ));
        assert!(matches!(
            archive_proposal(&pool, stranger, proposal.id).await,
            Err(AppError::ProposalNotFound)
        ));
        assert!(list_proposals(&pool, stranger).await.unwrap().is_empty());

        // Untouched for the owner
        let mine = get_proposal(&pool, owner, proposal.id).await.unwrap();
        assert_eq!(mine.title, "Redesign");
        assert_eq!(mine.status(), Some(ProposalStatus::Draft));
    }

    #[sqlx::test]
    async fn archived_proposals_are_hidden(pool: DbPool) {
        let owner = new_key(&pool, "Acme").await;
        let kept = create_proposal(&pool, owner, draft("Kept")).await.unwrap();
        let gone = create_proposal(&pool, owner, draft("Gone")).await.unwrap();
        set_status(&pool, owner, gone.id, ProposalStatus::Sent).await;

        archive_proposal(&pool, owner, gone.id).await.unwrap();

        let listed: Vec<Uuid> = list_proposals(&pool, owner)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(listed, vec![kept.id]);

        assert!(matches!(
            get_proposal(&pool, owner, gone.id).await,
            Err(AppError::ProposalNotFound)
        ));
        assert!(matches!(
            update_proposal(&pool, owner, gone.id, UpdateProposalRequest::default()).await,
            Err(AppError::ProposalNotFound)
        ));
        assert!(matches!(
            archive_proposal(&pool, owner, gone.id).await,
            Err(AppError::ProposalNotFound)
        ));
        assert!(matches!(
            find_public(&pool, &gone.share_token).await,
            Err(AppError::ProposalNotFound)
        ));
    }

    #[sqlx::test]
    async fn patch_updates_only_present_fields(pool: DbPool) {
        let owner = new_key(&pool, "Acme").await;
        let proposal = create_proposal(&pool, owner, draft("Redesign")).await.unwrap();

        let request: UpdateProposalRequest =
            serde_json::from_value(json!({"total_cents": 750000})).unwrap();
        let updated = update_proposal(&pool, owner, proposal.id, request).await.unwrap();
        assert_eq!(updated.total_cents, 750000);
        assert_eq!(updated.title, "Redesign");
        assert_eq!(updated.client_email.as_deref(), Some("cto@globex.example"));

        let request: UpdateProposalRequest =
            serde_json::from_value(json!({"client_email": null})).unwrap();
        let cleared = update_proposal(&pool, owner, proposal.id, request).await.unwrap();
        assert_eq!(cleared.client_email, None);
        assert_eq!(cleared.total_cents, 750000);
    }

    #[sqlx::test]
    async fn public_view_requires_a_sent_proposal(pool: DbPool) {
        let owner = new_key(&pool, "Acme").await;
        let proposal = create_proposal(&pool, owner, draft("Redesign")).await.unwrap();

        assert!(matches!(
            find_public(&pool, &proposal.share_token).await,
            Err(AppError::ProposalNotFound)
        ));
        assert!(matches!(
            find_public(&pool, "no-such-token").await,
            Err(AppError::ProposalNotFound)
        ));

        set_status(&pool, owner, proposal.id, ProposalStatus::Sent).await;
        let shown = find_public(&pool, &proposal.share_token).await.unwrap();
        assert_eq!(shown.id, proposal.id);
    }

    #[sqlx::test]
    async fn declined_proposal_cannot_be_accepted(pool: DbPool) {
        let owner = new_key(&pool, "Acme").await;
        let proposal = create_proposal(&pool, owner, draft("Redesign")).await.unwrap();
        set_status(&pool, owner, proposal.id, ProposalStatus::Declined).await;

        assert!(matches!(
            accept_public(&pool, &proposal.share_token).await,
            Err(AppError::InvalidState(_))
        ));
        let unchanged = get_proposal(&pool, owner, proposal.id).await.unwrap();
        assert_eq!(unchanged.status(), Some(ProposalStatus::Declined));
    }

    #[sqlx::test]
    async fn draft_proposal_cannot_be_accepted(pool: DbPool) {
        let owner = new_key(&pool, "Acme").await;
        let proposal = create_proposal(&pool, owner, draft("Redesign")).await.unwrap();

        assert!(matches!(
            accept_public(&pool, &proposal.share_token).await,
            Err(AppError::ProposalNotFound)
        ));
    }

    #[sqlx::test]
    async fn sent_proposal_is_accepted_once(pool: DbPool) {
        let owner = new_key(&pool, "Acme").await;
        let proposal = create_proposal(&pool, owner, draft("Redesign")).await.unwrap();
        set_status(&pool, owner, proposal.id, ProposalStatus::Sent).await;

        let accepted = accept_public(&pool, &proposal.share_token).await.unwrap();
        assert_eq!(accepted.status(), Some(ProposalStatus::Accepted));

        assert!(matches!(
            accept_public(&pool, &proposal.share_token).await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[sqlx::test]
    async fn concurrent_accepts_have_one_winner(pool: DbPool) {
        let owner = new_key(&pool, "Acme").await;
        let proposal = create_proposal(&pool, owner, draft("Redesign")).await.unwrap();
        set_status(&pool, owner, proposal.id, ProposalStatus::Sent).await;

        let (first, second) = tokio::join!(
            accept_public(&pool, &proposal.share_token),
            accept_public(&pool, &proposal.share_token)
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|r| matches!(r, Err(AppError::InvalidState(_))))
                .count(),
            1
        );
    }
}
