//! Delivery address types.

use serde::{Deserialize, Serialize};

use super::id::AddressId;

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Server-assigned address id.
    pub id: AddressId,
    /// Editable fields.
    #[serde(flatten)]
    pub fields: AddressInput,
}

/// Address fields as submitted to the add and update endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressInput {
    pub full_name: String,
    pub mobile_number: String,
    pub alt_mobile_number: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub landmark: String,
}

impl AddressInput {
    /// Wire names of fields that must be non-blank, in form order.
    pub const REQUIRED: [&'static str; 6] = [
        "fullName",
        "mobileNumber",
        "addressLine1",
        "city",
        "state",
        "pincode",
    ];

    /// Returns the wire name of the first required field that is blank.
    #[must_use]
    pub fn first_missing(&self) -> Option<&'static str> {
        let values = [
            &self.full_name,
            &self.mobile_number,
            &self.address_line1,
            &self.city,
            &self.state,
            &self.pincode,
        ];

        Self::REQUIRED
            .into_iter()
            .zip(values)
            .find_map(|(name, value)| value.trim().is_empty().then_some(name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete() -> AddressInput {
        AddressInput {
            full_name: "Asha Rao".to_string(),
            mobile_number: "9000000000".to_string(),
            address_line1: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            pincode: "560001".to_string(),
            ..AddressInput::default()
        }
    }

    #[test]
    fn test_complete_input_has_nothing_missing() {
        assert_eq!(complete().first_missing(), None);
    }

    #[test]
    fn test_first_missing_reports_form_order() {
        let mut input = complete();
        input.city = "  ".to_string();
        input.pincode = String::new();
        assert_eq!(input.first_missing(), Some("city"));
    }

    #[test]
    fn test_optional_fields_not_required() {
        let input = complete();
        assert!(input.landmark.is_empty());
        assert!(input.alt_mobile_number.is_empty());
        assert_eq!(input.first_missing(), None);
    }

    #[test]
    fn test_address_wire_shape_is_flat() {
        let address: Address = serde_json::from_value(serde_json::json!({
            "id": 4,
            "fullName": "Asha Rao",
            "addressLine1": "12 MG Road",
            "city": "Bengaluru",
            "pincode": "560001"
        }))
        .unwrap();

        assert_eq!(address.id, AddressId::new(4));
        assert_eq!(address.fields.address_line1, "12 MG Road");

        let json = serde_json::to_value(&address).unwrap();
        assert_eq!(json["fullName"], "Asha Rao");
        assert_eq!(json["id"], 4);
    }
}
