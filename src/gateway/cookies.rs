use actix_web::cookie::{time::Duration, Cookie, SameSite};

/// Cookie portant le token d'accès de l'API
pub const ACCESS_COOKIE: &str = "nest_access";
/// Cookie portant le refresh token de l'API
pub const REFRESH_COOKIE: &str = "nest_refresh";

/// Durée de vie du cookie d'accès
pub const ACCESS_TTL_HOURS: i64 = 24;
/// Durée de vie du cookie de renouvellement
pub const REFRESH_TTL_DAYS: i64 = 30;

fn base_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Cookie `nest_access`, httpOnly / secure / SameSite=Lax, 24 h
pub fn access_cookie(token: &str) -> Cookie<'static> {
    let mut cookie = base_cookie(ACCESS_COOKIE, token.to_string());
    cookie.set_max_age(Duration::hours(ACCESS_TTL_HOURS));
    cookie
}

/// Cookie `nest_refresh`, httpOnly / secure / SameSite=Lax, 30 j
pub fn refresh_cookie(token: &str) -> Cookie<'static> {
    let mut cookie = base_cookie(REFRESH_COOKIE, token.to_string());
    cookie.set_max_age(Duration::days(REFRESH_TTL_DAYS));
    cookie
}

/// Cookie d'expiration immédiate, pour la déconnexion
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = base_cookie(name, String::new());
    cookie.set_max_age(Duration::ZERO);
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_cookie_attributes() {
        let cookie = access_cookie("jeton");
        assert_eq!(cookie.name(), "nest_access");
        assert_eq!(cookie.value(), "jeton");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::hours(24)));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_refresh_cookie_lives_thirty_days() {
        let cookie = refresh_cookie("jeton");
        assert_eq!(cookie.name(), "nest_refresh");
        assert_eq!(cookie.max_age(), Some(Duration::days(30)));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let cookie = removal_cookie(ACCESS_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}
