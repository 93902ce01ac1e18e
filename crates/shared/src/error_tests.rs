use crate::error::AppError;
use rstest::rstest;
use validator::Validate;

#[rstest]
#[case(AppError::Unauthorized("test".into()), 401, "UNAUTHORIZED")]
#[case(AppError::Forbidden("test".into()), 403, "FORBIDDEN")]
#[case(AppError::NotFound("test".into()), 404, "NOT_FOUND")]
#[case(AppError::Validation("test".into()), 400, "VALIDATION_ERROR")]
#[case(AppError::BusinessRule("test".into()), 422, "BUSINESS_RULE_VIOLATION")]
#[case(AppError::Conflict("test".into()), 409, "CONFLICT")]
#[case(AppError::Database("test".into()), 500, "DATABASE_ERROR")]
#[case(AppError::Internal("test".into()), 500, "INTERNAL_ERROR")]
fn test_app_error_status_and_code(
    #[case] error: AppError,
    #[case] status: u16,
    #[case] code: &str,
) {
    assert_eq!(error.status_code(), status);
    assert_eq!(error.error_code(), code);
    assert_eq!(error.is_client_error(), status < 500);
}

#[test]
fn test_app_error_display() {
    assert_eq!(
        format!("{}", AppError::Unauthorized("msg".into())),
        "Authentication failed: msg"
    );
    assert_eq!(
        format!("{}", AppError::BusinessRule("msg".into())),
        "Business rule violation: msg"
    );
    assert_eq!(
        format!("{}", AppError::Conflict("msg".into())),
        "Conflict: msg"
    );
}

#[test]
fn test_public_message_hides_server_detail() {
    let err = AppError::Database("connection refused on 10.0.0.3".into());
    assert_eq!(err.public_message(), "An internal error occurred");

    let err = AppError::BusinessRule("Insufficient points".into());
    assert_eq!(err.public_message(), "Insufficient points");
}

#[derive(Validate)]
struct Payload {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    password: String,
}

#[test]
fn test_validation_errors_convert_to_validation_variant() {
    let payload = Payload {
        email: "not-an-email".into(),
        password: "short".into(),
    };
    let err: AppError = payload.validate().unwrap_err().into();

    let AppError::Validation(message) = err else {
        panic!("expected validation error");
    };
    assert!(message.contains("email: email"));
    assert!(message.contains("password: must be at least 8 characters"));
}
