use crate::entra::Claims;

const USER_ASSIGNED_IDENTITIES: &str = "providers/microsoft.managedidentity/userassignedidentities";

/// Claims consulted after `xms_mirid`, highest priority first.
const NAME_CLAIMS: [&str; 3] = ["upn", "preferred_username", "unique_name"];

/// Extract the identity name from the resource path in an `xms_mirid` claim.
///
/// User-assigned managed identities carry a path of the form
/// `/subscriptions/{id}/resourcegroups/{group}/providers/Microsoft.ManagedIdentity/userAssignedIdentities/{name}`;
/// `{name}` is the role the identity logs into PostgreSQL as. Anything else yields `None`.
///
/// ```rust
/// # use sqlx_azure::entra::parse_principal_name;
/// assert_eq!(
///     parse_principal_name(
///         "/subscriptions/x/resourcegroups/y/providers/Microsoft.ManagedIdentity/userAssignedIdentities/my-app"
///     ),
///     Some("my-app")
/// );
///
/// // system-assigned identities are not named by their path
/// assert_eq!(
///     parse_principal_name("/subscriptions/x/resourcegroups/y/providers/Microsoft.Web/sites/my-site"),
///     None
/// );
/// ```
pub fn parse_principal_name(xms_mirid: &str) -> Option<&str> {
    let (prefix, name) = xms_mirid.rsplit_once('/')?;

    if name.is_empty() || !ends_with_ignore_ascii_case(prefix, USER_ASSIGNED_IDENTITIES) {
        return None;
    }

    Some(name)
}

/// Determine the database username for the principal a token was issued to.
///
/// The first non-empty candidate wins:
///
/// 1. the identity name in `xms_mirid`, see [`parse_principal_name`];
/// 2. `upn`;
/// 3. `preferred_username`;
/// 4. `unique_name`.
pub fn resolve_username(claims: &Claims) -> Option<String> {
    let from_mirid = claims.get("xms_mirid").and_then(parse_principal_name);

    from_mirid
        .into_iter()
        .chain(NAME_CLAIMS.iter().filter_map(|name| claims.get(name)))
        .find(|name| !name.is_empty())
        .map(str::to_owned)
}

fn ends_with_ignore_ascii_case(haystack: &str, suffix: &str) -> bool {
    haystack.len() >= suffix.len()
        && haystack.as_bytes()[haystack.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MIRID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourcegroups/rg/providers/Microsoft.ManagedIdentity/userAssignedIdentities/my-app";

    fn claims(value: serde_json::Value) -> Claims {
        match value {
            serde_json::Value::Object(map) => map.into(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn it_parses_user_assigned_identity_paths() {
        assert_eq!(parse_principal_name(MIRID), Some("my-app"));
        assert_eq!(
            parse_principal_name(&MIRID.to_ascii_uppercase()),
            Some("MY-APP")
        );
        assert_eq!(
            parse_principal_name(
                "providers/microsoft.managedidentity/userassignedidentities/x"
            ),
            Some("x")
        );
    }

    #[test]
    fn it_rejects_other_paths() {
        assert_eq!(parse_principal_name(""), None);
        assert_eq!(parse_principal_name("my-app"), None);
        assert_eq!(parse_principal_name(&format!("{MIRID}/")), None);
        assert_eq!(
            parse_principal_name("/subscriptions/x/providers/Microsoft.Web/sites/my-app"),
            None
        );
        // the identity name must be the last segment
        assert_eq!(
            parse_principal_name(
                "/providers/Microsoft.ManagedIdentity/userAssignedIdentities/my-app/extra"
            ),
            None
        );
        // multi-byte characters right at the split point must not panic
        assert_eq!(parse_principal_name("ééééééééééééééééééééééééééééééé/x"), None);
    }

    #[test]
    fn it_prefers_the_managed_identity_name() {
        let claims = claims(json!({
            "xms_mirid": MIRID,
            "upn": "user@example.com",
            "preferred_username": "preferred@example.com",
        }));

        assert_eq!(resolve_username(&claims).as_deref(), Some("my-app"));
    }

    #[test]
    fn it_falls_back_through_name_claims_in_order() {
        let claims1 = claims(json!({
            "xms_mirid": "/subscriptions/x/providers/Microsoft.Web/sites/my-site",
            "upn": "user@example.com",
            "preferred_username": "preferred@example.com",
            "unique_name": "unique@example.com",
        }));
        assert_eq!(resolve_username(&claims1).as_deref(), Some("user@example.com"));

        let claims2 = claims(json!({
            "upn": "",
            "preferred_username": "preferred@example.com",
            "unique_name": "unique@example.com",
        }));
        assert_eq!(
            resolve_username(&claims2).as_deref(),
            Some("preferred@example.com")
        );

        let claims3 = claims(json!({ "unique_name": "unique@example.com" }));
        assert_eq!(
            resolve_username(&claims3).as_deref(),
            Some("unique@example.com")
        );
    }

    #[test]
    fn it_resolves_nothing_without_name_claims() {
        assert_eq!(resolve_username(&Claims::default()), None);

        let claims = claims(json!({
            "oid": "00000000-0000-0000-0000-000000000000",
            "upn": 42,
            "unique_name": "",
        }));
        assert_eq!(resolve_username(&claims), None);
    }

    #[test]
    fn it_resolves_the_documented_examples() {
        let claims1 = claims(json!({
            "xms_mirid": "/subscriptions/x/resourcegroups/y/providers/Microsoft.ManagedIdentity/userAssignedIdentities/my-app"
        }));
        assert_eq!(resolve_username(&claims1).as_deref(), Some("my-app"));

        let claims2 = claims(json!({ "upn": "user@example.com" }));
        assert_eq!(resolve_username(&claims2).as_deref(), Some("user@example.com"));
    }
}
