//! Delivery address commands.

use clap::Args;

use sdcart_client::AppContext;
use sdcart_core::{Address, AddressId, AddressInput};

use super::CliError;

/// Fields for `sdcart address set`.
#[derive(Args)]
pub struct AddressArgs {
    /// Update this address instead of adding a new one
    #[arg(long)]
    id: Option<i64>,

    #[arg(long)]
    full_name: String,

    #[arg(long)]
    mobile_number: String,

    #[arg(long, default_value = "")]
    alt_mobile_number: String,

    #[arg(long)]
    address_line1: String,

    #[arg(long, default_value = "")]
    address_line2: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    state: String,

    #[arg(long)]
    pincode: String,

    #[arg(long, default_value = "")]
    landmark: String,
}

impl AddressArgs {
    fn into_parts(self) -> (Option<AddressId>, AddressInput) {
        let input = AddressInput {
            full_name: self.full_name,
            mobile_number: self.mobile_number,
            alt_mobile_number: self.alt_mobile_number,
            address_line1: self.address_line1,
            address_line2: self.address_line2,
            city: self.city,
            state: self.state,
            pincode: self.pincode,
            landmark: self.landmark,
        };
        (self.id.map(AddressId::new), input)
    }
}

/// Show the saved address.
///
/// # Errors
///
/// Returns an error if there is no valid session or the lookup fails.
pub async fn show(context: &AppContext) -> Result<(), CliError> {
    match context.addresses().current().await? {
        Some(address) => print_address(&address),
        None => println!("No address saved"),
    }
    Ok(())
}

/// Add an address, or update the one named by `--id`.
///
/// # Errors
///
/// Returns an error if a required field is blank or the backend refuses.
pub async fn set(context: &AppContext, args: AddressArgs) -> Result<(), CliError> {
    let (id, input) = args.into_parts();
    match id {
        Some(id) => {
            context.addresses().update(id, &input).await?;
            println!("Address {id} updated");
        }
        None => {
            context.addresses().add(&input).await?;
            println!("Address added");
        }
    }
    Ok(())
}

/// Delete an address.
///
/// # Errors
///
/// Returns an error if there is no valid session or the backend refuses.
pub async fn delete(context: &AppContext, id: i64) -> Result<(), CliError> {
    let id = AddressId::new(id);
    context.addresses().delete(id).await?;
    println!("Address {id} deleted");
    Ok(())
}

fn print_address(address: &Address) {
    let fields = &address.fields;
    println!("Address {}", address.id);
    println!("  {}", fields.full_name);
    println!("  {}", fields.address_line1);
    if !fields.address_line2.trim().is_empty() {
        println!("  {}", fields.address_line2);
    }
    if !fields.landmark.trim().is_empty() {
        println!("  Near {}", fields.landmark);
    }
    println!("  {}, {} {}", fields.city, fields.state, fields.pincode);
    println!("  Mobile: {}", fields.mobile_number);
    if !fields.alt_mobile_number.trim().is_empty() {
        println!("  Alt:    {}", fields.alt_mobile_number);
    }
}
