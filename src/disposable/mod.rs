//! Disposable-domain gate: static denylist of throw-away mail providers.

use phf::phf_set;

use crate::validator::domain_of;

/// Lower-case domains of known disposable-mail providers. Reserved example
/// domains are listed too: nobody receives mail there.
static DISPOSABLE_DOMAINS: phf::Set<&'static str> = phf_set! {
    "0-mail.com",
    "10minutemail.com",
    "10minutemail.net",
    "20minutemail.com",
    "33mail.com",
    "armyspy.com",
    "binkmail.com",
    "bobmail.info",
    "cuvox.de",
    "dayrep.com",
    "discard.email",
    "discardmail.com",
    "dispostable.com",
    "dodgit.com",
    "dropmail.me",
    "einrot.com",
    "emailondeck.com",
    "example.com",
    "example.net",
    "example.org",
    "fakeinbox.com",
    "fleckens.hu",
    "getairmail.com",
    "getnada.com",
    "guerrillamail.biz",
    "guerrillamail.com",
    "guerrillamail.de",
    "guerrillamail.info",
    "guerrillamail.net",
    "guerrillamail.org",
    "gustr.com",
    "harakirimail.com",
    "incognitomail.org",
    "jetable.org",
    "jourrapide.com",
    "mailcatch.com",
    "maildrop.cc",
    "mailexpire.com",
    "mailinator.com",
    "mailinator.net",
    "mailinator2.com",
    "mailnesia.com",
    "mintemail.com",
    "moakt.com",
    "mohmal.com",
    "mytemp.email",
    "mytrashmail.com",
    "nada.email",
    "rhyta.com",
    "sharklasers.com",
    "spam4.me",
    "spambox.us",
    "spamgourmet.com",
    "superrito.com",
    "teleworm.us",
    "temp-mail.io",
    "temp-mail.org",
    "tempail.com",
    "tempmail.net",
    "tempmailo.com",
    "tempr.email",
    "throwawaymail.com",
    "trashmail.com",
    "trashmail.de",
    "trashmail.net",
    "wegwerfmail.de",
    "wegwerfmail.net",
    "yopmail.com",
    "yopmail.fr",
    "yopmail.net",
};

/// `true` when the domain of `address` is a known disposable provider.
/// Addresses without a domain are not disposable.
pub fn is_disposable(address: &str) -> bool {
    domain_of(address).is_some_and(is_disposable_domain)
}

/// Case-insensitive exact membership test.
pub fn is_disposable_domain(domain: &str) -> bool {
    let normalized = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    DISPOSABLE_DOMAINS.contains(normalized.as_str())
}
