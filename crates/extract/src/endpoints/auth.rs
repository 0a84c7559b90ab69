use once_cell::sync::Lazy;
use regex::Regex;

/// Identifiers that name authentication middleware or current-user dependencies.
static AUTH_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:auth|authn|authz|authenticate\w*|authenticated|authorize\w*|is_?auth\w*",
        r"|ensure_?authenticated|ensure_?logged_?in|is_?logged_?in|require_?auth\w*",
        r"|requires_?auth\w*|auth_?required|auth_?middleware|auth_?guard|login_?required",
        r"|require_?login|require_?user|verify_?token|verify_?jwt|check_?jwt|jwt_?auth\w*",
        r"|jwt_?required|passport|protect|protected|with_?auth|bearer_?auth|basic_?auth",
        r"|session_?required|current_?user|get_?current_?\w+|oauth2_?scheme)\b",
    ))
    .expect("auth token pattern is valid")
});

/// Decorators and annotations that gate a handler or a whole controller.
static GUARD_DECORATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:@\s*(?:[\w.]+\.)?|#\[\s*)(?:login_required|jwt_required|fresh_jwt_required",
        r"|auth_required|requires_auth|require_auth|token_required|permission_required",
        r"|roles_required|roles_accepted|authenticated|UseGuards|PreAuthorize|PostAuthorize",
        r"|Secured|RolesAllowed|Authorize|Authorized|ApiBearerAuth|Auth|Roles|protect)\b",
    ))
    .expect("guard decorator pattern is valid")
});

/// `Depends(...)` / `Security(...)` parameters that resolve the current user.
static DEPENDS_AUTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:Depends|Security)\s*\(\s*[\w.]*?(?:current_?user|get_?current\w*|auth\w*",
        r"|verify\w*|require\w*user\w*|oauth2_?scheme|token\w*)",
    ))
    .expect("depends pattern is valid")
});

static ANONYMOUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:@\s*)(?:AllowAnonymous|Public|PermitAll|SkipAuth)\b")
        .expect("anonymous marker pattern is valid")
});

/// True when a middleware argument or gate expression names authentication.
pub fn mentions_auth(expr: &str) -> bool {
    AUTH_TOKEN.is_match(expr)
}

/// True when a decorator line gates the declaration it is attached to.
pub fn is_guard_decorator(decorator: &str) -> bool {
    GUARD_DECORATOR.is_match(decorator.trim_start())
}

/// True when a decorator explicitly opts a handler out of controller-level guards.
pub fn is_anonymous_marker(decorator: &str) -> bool {
    ANONYMOUS.is_match(decorator.trim_start())
}

/// True when a signature or decorator argument list injects the current user.
pub fn depends_on_user(text: &str) -> bool {
    DEPENDS_AUTH.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middleware_names_are_recognized() {
        for expr in [
            "requireAuth",
            "authenticate",
            "passport.authenticate('jwt')",
            "auth.required",
            "AuthRequired()",
            "isAuthenticated",
            "{ preHandler: [fastify.authenticate] }",
        ] {
            assert!(mentions_auth(expr), "{expr}");
        }
        for expr in ["validate(schema)", "authorController.list", "rateLimit", "upload.single('f')"] {
            assert!(!mentions_auth(expr), "{expr}");
        }
    }

    #[test]
    fn guard_decorators_are_recognized() {
        assert!(is_guard_decorator("@login_required"));
        assert!(is_guard_decorator("@UseGuards(AuthGuard('jwt'))"));
        assert!(is_guard_decorator("@PreAuthorize(\"hasRole('ADMIN')\")"));
        assert!(is_guard_decorator("@auth.login_required"));
        assert!(!is_guard_decorator("@app.route('/x')"));
        assert!(!is_guard_decorator("@Get(':id')"));
        assert!(is_anonymous_marker("@Public()"));
    }

    #[test]
    fn current_user_dependencies() {
        assert!(depends_on_user("user: User = Depends(get_current_user)"));
        assert!(depends_on_user("dependencies=[Depends(auth.verify)]"));
        assert!(!depends_on_user("db: Session = Depends(get_db)"));
    }
}
