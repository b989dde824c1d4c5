//! Organization provisioning - idempotent tenant creation.
//!
//! Correctness under concurrent duplicate submission rests on the store's
//! uniqueness constraints plus a read-before-write check, not on
//! in-process locks: a replayed idempotency key returns the original
//! result marked as a duplicate.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use service_core::error::AppError;
use tracing::{info, instrument};
use validator::Validate;

use crate::config::CollectionsConfig;
use crate::models::{
    CreateOrganizationRequest, Membership, Organization, ProvisionedOrganization, Role,
};
use crate::services::metrics::ORGANIZATIONS_TOTAL;
use crate::services::validation::{is_valid_currency, normalize_currency};
use crate::store::OrganizationStore;

/// Derive a URL-safe slug: diacritics folded to ASCII, lowercased,
/// non-alphanumeric runs collapsed to single hyphens.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut folded = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => folded.push('a'),
            'æ' => folded.push_str("ae"),
            'ç' => folded.push('c'),
            'è' | 'é' | 'ê' | 'ë' => folded.push('e'),
            'ì' | 'í' | 'î' | 'ï' => folded.push('i'),
            'ñ' => folded.push('n'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => folded.push('o'),
            'œ' => folded.push_str("oe"),
            'ß' => folded.push_str("ss"),
            'ù' | 'ú' | 'û' | 'ü' => folded.push('u'),
            'ý' | 'ÿ' => folded.push('y'),
            _ => folded.push(c),
        }
    }
    folded
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

pub struct OrganizationProvisioningService<S> {
    store: Arc<S>,
    max_slug_attempts: u32,
}

impl<S: OrganizationStore> OrganizationProvisioningService<S> {
    pub fn new(store: Arc<S>, config: &CollectionsConfig) -> Self {
        Self {
            store,
            max_slug_attempts: config.max_slug_attempts,
        }
    }

    /// Create an organization and its owning membership atomically. A
    /// second call carrying the same idempotency key returns the first
    /// result with `is_duplicate: true` instead of creating a second
    /// tenant or erroring.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_organization_with_owner(
        &self,
        request: &CreateOrganizationRequest,
    ) -> Result<ProvisionedOrganization, AppError> {
        request.validate()?;

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::InvalidInput(anyhow!(
                "Organization name is required"
            )));
        }
        let default_currency = normalize_currency(&request.default_currency);
        if !is_valid_currency(&default_currency) {
            return Err(AppError::InvalidInput(anyhow!(
                "Unsupported currency '{}'",
                request.default_currency
            )));
        }
        let country_code = request
            .country_code
            .as_deref()
            .map(|code| code.trim().to_ascii_uppercase());

        // Read-before-write duplicate check; the unique constraint below
        // backstops the race.
        if let Some((organization, membership)) = self
            .store
            .find_by_idempotency_key(&request.idempotency_key)
            .await?
        {
            ORGANIZATIONS_TOTAL.with_label_values(&["duplicate"]).inc();
            info!(
                organization_id = %organization.organization_id,
                "Duplicate provisioning request replayed"
            );
            return Ok(ProvisionedOrganization {
                organization,
                membership,
                is_duplicate: true,
            });
        }

        let slug = self.available_slug(&name).await?;
        let organization = Organization::new(
            name,
            slug,
            country_code,
            default_currency,
            request.idempotency_key.clone(),
        );
        let membership =
            Membership::new(organization.organization_id, request.user_id, Role::Owner);

        match self.store.create_with_owner(&organization, &membership).await {
            Ok(()) => {
                ORGANIZATIONS_TOTAL.with_label_values(&["created"]).inc();
                info!(
                    organization_id = %organization.organization_id,
                    slug = %organization.slug,
                    "Organization provisioned"
                );
                Ok(ProvisionedOrganization {
                    organization,
                    membership,
                    is_duplicate: false,
                })
            }
            Err(AppError::Conflict(err)) => {
                // Lost a race against an identical submission: surface the
                // winner's result.
                if let Some((organization, membership)) = self
                    .store
                    .find_by_idempotency_key(&request.idempotency_key)
                    .await?
                {
                    ORGANIZATIONS_TOTAL.with_label_values(&["duplicate"]).inc();
                    return Ok(ProvisionedOrganization {
                        organization,
                        membership,
                        is_duplicate: true,
                    });
                }
                Err(AppError::Conflict(err))
            }
            Err(err) => Err(err),
        }
    }

    /// First free slug for a name: the base slug, then numeric suffixes up
    /// to the configured bound, then a timestamp suffix.
    async fn available_slug(&self, name: &str) -> Result<String, AppError> {
        let base = slugify(name);
        let base = if base.is_empty() {
            "organization".to_string()
        } else {
            base
        };

        if !self.store.slug_exists(&base).await? {
            return Ok(base);
        }
        for attempt in 2..=self.max_slug_attempts {
            let candidate = format!("{}-{}", base, attempt);
            if !self.store.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Ok(format!("{}-{}", base, Utc::now().timestamp_millis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_folds_diacritics_and_collapses_punctuation() {
        assert_eq!(slugify("Acme GmbH & Co."), "acme-gmbh-co");
        assert_eq!(slugify("Café São Paulo"), "cafe-sao-paulo");
        assert_eq!(slugify("  Nørre  Straße  "), "norre-strasse");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn slugify_is_already_stable_for_clean_names() {
        assert_eq!(slugify("northwind"), "northwind");
        assert_eq!(slugify("Northwind Trading 2026"), "northwind-trading-2026");
    }
}
