use thiserror::Error;

use crate::domain::product::{ModelId, ProductCategory};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{category} line item {model_id} has no unit cost in its snapshot")]
    MissingUnitCost { category: ProductCategory, model_id: ModelId },
    #[error("{category} line item {model_id} is priced per watt but has no rating in its snapshot")]
    MissingRating { category: ProductCategory, model_id: ModelId },
    #[error("invalid input for `{field}`: {reason}")]
    InvalidInput { field: String, reason: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput { field: field.into(), reason: reason.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
    #[error("{kind} `{id}` is not an active record and cannot be applied to the quote")]
    ReferenceIntegrity { kind: String, id: String },
    #[error("{product} product is missing required attribute `{attribute}`")]
    MissingAttribute { product: String, attribute: String },
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The quote could not be priced. Check the design and selections and try again."
            }
            Self::NotFound { .. } => "A record required to price this quote could not be found.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }

    pub fn partner_config_not_found(partner_id: impl Into<String>) -> Self {
        Self::NotFound { entity: "partner markup config".to_owned(), id: partner_id.into() }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            error @ (ApplicationError::ReferenceIntegrity { .. }
            | ApplicationError::MissingAttribute { .. }) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            error @ ApplicationError::NotFound { .. } => {
                Self::NotFound { message: error.to_string(), correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::product::{ModelId, ProductCategory};
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn missing_unit_cost_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::MissingUnitCost {
            category: ProductCategory::Panel,
            model_id: ModelId("panel-400".to_owned()),
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ref message,
            } if correlation_id == "req-1" && message.contains("panel-400")
        ));
    }

    #[test]
    fn missing_partner_config_maps_to_not_found() {
        let interface = ApplicationError::partner_config_not_found("partner-7").into_interface("req-2");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert_eq!(
            interface.user_message(),
            "A record required to price this quote could not be found."
        );
    }

    #[test]
    fn inactive_discount_reference_maps_to_bad_request() {
        let interface = ApplicationError::ReferenceIntegrity {
            kind: "discount".to_owned(),
            id: "spring-sale".to_owned(),
        }
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("buyout rate out of range".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
