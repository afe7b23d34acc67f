//! Schema validation for implementation-specific configuration tables.
//!
//! Wallet and delivery implementations receive their `[*.implementations.<name>]`
//! table as raw TOML. Each implementation declares a [`Schema`] describing the
//! fields it expects, and the table is checked against it before the
//! implementation is constructed.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// A `0x`-prefixed 20-byte hex address string.
	Address,
	/// An `http://` or `https://` URL string.
	Url,
	Array(Box<FieldType>),
	Table(Schema),
}

impl FieldType {
	fn describe(&self) -> &'static str {
		match self {
			FieldType::String => "string",
			FieldType::Integer { .. } => "integer",
			FieldType::Boolean => "boolean",
			FieldType::Address => "address",
			FieldType::Url => "url",
			FieldType::Array(_) => "array",
			FieldType::Table(_) => "table",
		}
	}
}

/// Custom check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom validator returning an error message on failure.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, path: &str, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(path, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: path.to_string(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a TOML table.
#[derive(Debug, Default)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates `config`, which must be a table.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		self.validate_at("", config)
	}

	fn validate_at(&self, prefix: &str, config: &toml::Value) -> Result<(), ValidationError> {
		let root = if prefix.is_empty() { "root" } else { prefix };
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: root.to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		let path = |name: &str| {
			if prefix.is_empty() {
				name.to_string()
			} else {
				format!("{}.{}", prefix, name)
			}
		};

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(path(&field.name)))?;
			field.check(&path(&field.name), value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(&path(&field.name), value)?;
			}
		}

		Ok(())
	}
}

fn check_type(path: &str, value: &toml::Value, expected: &FieldType) -> Result<(), ValidationError> {
	let mismatch = || ValidationError::TypeMismatch {
		field: path.to_string(),
		expected: expected.describe().to_string(),
		actual: value.type_str().to_string(),
	};
	let invalid = |message: String| ValidationError::InvalidValue {
		field: path.to_string(),
		message,
	};

	match expected {
		FieldType::String => {
			value.as_str().ok_or_else(mismatch)?;
		},
		FieldType::Boolean => {
			value.as_bool().ok_or_else(mismatch)?;
		},
		FieldType::Integer { min, max } => {
			let int_val = value.as_integer().ok_or_else(mismatch)?;
			if let Some(min_val) = min.filter(|m| int_val < *m) {
				return Err(invalid(format!(
					"Value {} is less than minimum {}",
					int_val, min_val
				)));
			}
			if let Some(max_val) = max.filter(|m| int_val > *m) {
				return Err(invalid(format!(
					"Value {} is greater than maximum {}",
					int_val, max_val
				)));
			}
		},
		FieldType::Address => {
			let s = value.as_str().ok_or_else(mismatch)?;
			crate::purchase::parse_address("address", s)
				.map_err(|_| invalid(format!("'{}' is not a 20-byte hex address", s)))?;
		},
		FieldType::Url => {
			let s = value.as_str().ok_or_else(mismatch)?;
			if !(s.starts_with("http://") || s.starts_with("https://")) {
				return Err(invalid(format!("'{}' is not an http(s) URL", s)));
			}
		},
		FieldType::Array(inner) => {
			let items = value.as_array().ok_or_else(mismatch)?;
			for (i, item) in items.iter().enumerate() {
				check_type(&format!("{}[{}]", path, i), item, inner)?;
			}
		},
		FieldType::Table(schema) => schema.validate_at(path, value)?,
	}

	Ok(())
}

/// Implemented by every wallet and delivery implementation to describe the
/// configuration table it accepts.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table(src: &str) -> toml::Value {
		toml::from_str(src).unwrap()
	}

	fn wallet_schema() -> Schema {
		Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(k) if k.trim_start_matches("0x").len() == 64 => Ok(()),
					_ => Err("private key must be 32 bytes of hex".to_string()),
				}
			})],
			vec![
				Field::new("auto_approve", FieldType::Boolean),
				Field::new("sender", FieldType::Address),
				Field::new(
					"limits",
					FieldType::Table(Schema::new(
						vec![Field::new(
							"max_tokens",
							FieldType::Integer {
								min: Some(1),
								max: Some(1000),
							},
						)],
						vec![],
					)),
				),
			],
		)
	}

	#[test]
	fn test_valid_table() {
		let config = table(
			r#"
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
auto_approve = true
sender = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
[limits]
max_tokens = 10
"#,
		);
		assert!(wallet_schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_and_mistyped_fields() {
		let err = wallet_schema()
			.validate(&table("auto_approve = true"))
			.unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(ref f) if f == "private_key"));

		let err = wallet_schema()
			.validate(&table(
				r#"
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
auto_approve = "yes"
"#,
			))
			.unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { ref field, .. } if field == "auto_approve"));
	}

	#[test]
	fn test_nested_paths_and_custom_checks() {
		let err = wallet_schema()
			.validate(&table(
				r#"
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
[limits]
max_tokens = 5000
"#,
			))
			.unwrap_err();
		assert!(err.to_string().contains("limits.max_tokens"));

		let err = wallet_schema()
			.validate(&table(r#"private_key = "0x1234""#))
			.unwrap_err();
		assert!(err.to_string().contains("32 bytes"));
	}

	#[test]
	fn test_address_and_url_types() {
		let schema = Schema::new(
			vec![
				Field::new("contract", FieldType::Address),
				Field::new("rpc_url", FieldType::Url),
			],
			vec![],
		);
		let ok = table(
			r#"
contract = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
rpc_url = "https://mainnet.base.org"
"#,
		);
		assert!(schema.validate(&ok).is_ok());

		let bad_url = table(
			r#"
contract = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
rpc_url = "ws://localhost:8546"
"#,
		);
		assert!(schema.validate(&bad_url).is_err());
	}
}
