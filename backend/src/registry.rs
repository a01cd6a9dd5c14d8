//! Ownership registry: one owner per commitment, registration only behind a valid proof.

use crate::db::{self, Db};
use crate::errors::ApiError;
use crate::models::{MelodyRecord, Owner, TransferRecord};
use chrono::{DateTime, Utc};
use melody_zk::Commitment;
use uuid::Uuid;

/// Record `(commitment, owner, at)`.
///
/// Refused when the proof did not verify and when the commitment already has an owner.
pub async fn register(
    db: &Db,
    commitment: &Commitment,
    proof_valid: bool,
    owner: &Owner,
    at: DateTime<Utc>,
) -> Result<MelodyRecord, ApiError> {
    if !proof_valid {
        tracing::info!(commitment = %commitment, "registration refused: proof did not verify");
        return Err(ApiError::Unprocessable("ownership proof did not verify".to_string()));
    }

    let record = MelodyRecord {
        commitment: commitment.to_string(),
        owner: owner.clone(),
        registered_at: at,
    };

    if !db::insert_melody(db, &record).await? {
        return Err(ApiError::Conflict("melody already registered".to_string()));
    }

    tracing::info!(commitment = %commitment, owner = %owner, "melody registered");
    Ok(record)
}

pub async fn lookup(db: &Db, commitment: &Commitment) -> Result<Option<MelodyRecord>, ApiError> {
    db::get_melody(db, &commitment.to_string()).await
}

pub async fn lookup_owner(db: &Db, commitment: &Commitment) -> Result<Option<Owner>, ApiError> {
    Ok(lookup(db, commitment).await?.map(|r| r.owner))
}

pub async fn list_by_owner(db: &Db, owner: &Owner) -> Result<Vec<String>, ApiError> {
    db::list_by_owner(db, owner).await
}

/// Hand a melody from its current owner to `to`.
pub async fn transfer(
    db: &Db,
    commitment: &Commitment,
    from: &Owner,
    to: &Owner,
    at: DateTime<Utc>,
) -> Result<TransferRecord, ApiError> {
    if from == to {
        return Err(ApiError::BadRequest("cannot transfer a melody to its current owner".to_string()));
    }

    let Some(current) = lookup_owner(db, commitment).await? else {
        return Err(ApiError::NotFound("melody not registered".to_string()));
    };
    if current != *from {
        return Err(ApiError::Conflict("only the current owner may transfer a melody".to_string()));
    }

    let record = TransferRecord {
        transfer_id: Uuid::new_v4(),
        commitment: commitment.to_string(),
        from: from.clone(),
        to: to.clone(),
        transferred_at: at,
    };

    // Ownership may have changed between the lookup and the update.
    if !db::transfer_owner(db, &record).await? {
        return Err(ApiError::Conflict("only the current owner may transfer a melody".to_string()));
    }

    tracing::info!(commitment = %commitment, from = %from, to = %to, "melody transferred");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;

    async fn memory_db() -> Db {
        let db = db::connect_with("sqlite::memory:", 1).await.unwrap();
        db::init_schema(&db).await.unwrap();
        db
    }

    fn owner(c: char) -> Owner {
        Owner::parse(&format!("0x{}", c.to_string().repeat(40))).unwrap()
    }

    #[tokio::test]
    async fn register_once_then_conflict() {
        let db = memory_db().await;
        let h = Commitment::from_scalar(Fr::from(1234u64));

        let rec = register(&db, &h, true, &owner('a'), Utc::now()).await.unwrap();
        assert_eq!(rec.commitment, "1234");
        assert_eq!(lookup_owner(&db, &h).await.unwrap(), Some(owner('a')));

        let err = register(&db, &h, true, &owner('b'), Utc::now()).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(lookup_owner(&db, &h).await.unwrap(), Some(owner('a')));
    }

    #[tokio::test]
    async fn invalid_proof_is_never_recorded() {
        let db = memory_db().await;
        let h = Commitment::from_scalar(Fr::from(55u64));

        let err = register(&db, &h, false, &owner('a'), Utc::now()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unprocessable(_)));
        assert_eq!(lookup_owner(&db, &h).await.unwrap(), None);
    }

    #[tokio::test]
    async fn transfer_rules() {
        let db = memory_db().await;
        let h = Commitment::from_scalar(Fr::from(77u64));
        register(&db, &h, true, &owner('a'), Utc::now()).await.unwrap();

        assert!(matches!(
            transfer(&db, &h, &owner('a'), &owner('a'), Utc::now()).await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            transfer(&db, &h, &owner('b'), &owner('c'), Utc::now()).await,
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            transfer(&db, &Commitment::from_scalar(Fr::from(78u64)), &owner('a'), &owner('b'), Utc::now()).await,
            Err(ApiError::NotFound(_))
        ));

        let t = transfer(&db, &h, &owner('a'), &owner('b'), Utc::now()).await.unwrap();
        assert_eq!(t.to, owner('b'));
        assert_eq!(lookup_owner(&db, &h).await.unwrap(), Some(owner('b')));
        assert_eq!(db::count_transfers(&db, "77").await.unwrap(), 1);

        assert!(list_by_owner(&db, &owner('a')).await.unwrap().is_empty());
        assert_eq!(list_by_owner(&db, &owner('b')).await.unwrap(), vec!["77".to_string()]);
    }
}
