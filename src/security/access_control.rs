//! Client IP allow/deny lists.

use std::net::IpAddr;

use crate::routing::table::SecurityPolicy;

/// Returns true if the client may be served by a domain with this policy.
///
/// A non-empty allow list admits only its members. The deny list is always
/// checked, so an address present in both lists is rejected.
pub fn is_permitted(policy: &SecurityPolicy, client: IpAddr) -> bool {
    let client = client.to_canonical();

    if !policy.allow.is_empty() && !policy.allow.contains(&client) {
        return false;
    }
    !policy.deny.contains(&client)
}
