//! Main entry point for the CosmicCart order service.
//!
//! `serve` runs the order HTTP API. `update-status` drives the restaurant
//! dashboard's status editor against a running service, and `flow` prints
//! the order status flow guide.

use cart_config::Config;
use cart_core::{
	EventBus, HttpOrderStore, OrderServiceBuilder, OrderStateMachine, OrderStatusPolicy,
	StatusChangeOutcome, StatusEditor, TracingNotifier,
};
use cart_storage::implementations::file::create_storage as create_file_storage;
use cart_storage::implementations::memory::create_storage as create_memory_storage;
use cart_types::{CartEvent, OrderEvent, OrderStatus};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the order service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", global = true)]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info", global = true)]
	log_level: String,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the order HTTP API (default)
	Serve,
	/// Change an order's status through the dashboard status editor
	UpdateStatus {
		/// Order to update
		#[arg(long)]
		order: u64,
		/// Requested status, e.g. ACCEPTED or in-cooking
		#[arg(long)]
		status: OrderStatus,
		/// Restaurant performing the update
		#[arg(long)]
		restaurant: u64,
	},
	/// Print the order flow guide, or the flow info for one status
	Flow {
		#[arg(long)]
		status: Option<OrderStatus>,
	},
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	match args.command.unwrap_or(Command::Serve) {
		Command::Serve => serve(&args.config).await,
		Command::UpdateStatus {
			order,
			status,
			restaurant,
		} => update_status(&args.config, order, status, restaurant).await,
		Command::Flow { status } => {
			let policy = OrderStatusPolicy::new();
			match status {
				Some(status) => println!("{}", policy.status_info(status)),
				None => println!("{}", policy.complete_flow_guide()),
			}
			Ok(())
		},
	}
}

async fn serve(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let Some(api_config) = config.api.clone().filter(|api| api.enabled) else {
		return Err("API server is disabled in the configuration".into());
	};

	let machine = Arc::new(build_order_service(config.clone())?);
	tokio::spawn(log_events(machine.event_bus().clone()));

	tracing::info!("Started order service");
	server::start_server(api_config, machine, config).await?;
	tracing::info!("Stopped order service");
	Ok(())
}

/// Builds the order service with the compiled-in storage implementations.
fn build_order_service(config: Config) -> Result<OrderStateMachine, Box<dyn std::error::Error>> {
	let storage_factories = create_factory_map!(
		cart_storage::StorageInterface,
		cart_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	Ok(OrderServiceBuilder::new(config).build(&storage_factories)?)
}

async fn log_events(event_bus: EventBus) {
	let mut receiver = event_bus.subscribe();
	loop {
		match receiver.recv().await {
			Ok(CartEvent::Order(event)) => match event {
				OrderEvent::Created { order } => {
					tracing::info!(order_id = order.id, restaurant_id = order.restaurant_id, "Order created")
				},
				OrderEvent::StatusChanged { order_id, from, to } => {
					tracing::info!(order_id, %from, %to, "Order status changed")
				},
				OrderEvent::TransitionRejected { order_id, from, to } => {
					tracing::warn!(order_id, %from, %to, "Order status change rejected")
				},
				OrderEvent::Deleted {
					order_id,
					restaurant_id,
				} => tracing::info!(order_id, restaurant_id, "Order deleted"),
			},
			Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Event logger lagged behind");
			},
			Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
		}
	}
}

async fn update_status(
	config_path: &Path,
	order_id: u64,
	status: OrderStatus,
	restaurant_id: u64,
) -> Result<(), Box<dyn std::error::Error>> {
	let config = Config::from_file(config_path).await?;
	let store = HttpOrderStore::from_config(&config.dashboard)?;
	let mut editor = StatusEditor::new(store, Arc::new(TracingNotifier))
		.with_notification_duration(config.dashboard.notification_duration_ms);

	editor.load(restaurant_id).await?;
	if editor.order(order_id).is_none() {
		// Not one of ours; fetch it anyway so the service decides.
		editor.refresh_order(order_id).await?;
	}

	match editor.request_status_change(order_id, status).await {
		StatusChangeOutcome::Updated(order) => {
			println!(
				"Order #{} is now {} {}",
				order.id,
				order.status.emoji(),
				order.status.label()
			);
			Ok(())
		},
		StatusChangeOutcome::Unchanged => {
			println!("Order #{} is already {}", order_id, status);
			Ok(())
		},
		StatusChangeOutcome::UnknownOrder => Err(format!("Order #{} not found", order_id).into()),
		StatusChangeOutcome::RejectedLocally { message }
		| StatusChangeOutcome::RejectedByBackend { message }
		| StatusChangeOutcome::Failed { message } => Err(message.into()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn test_args_subcommands() {
		let args = Args::parse_from([
			"cosmic-cart",
			"--config",
			"custom.toml",
			"update-status",
			"--order",
			"12",
			"--status",
			"out-for-delivery",
			"--restaurant",
			"3",
		]);
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "info");
		match args.command {
			Some(Command::UpdateStatus {
				order,
				status,
				restaurant,
			}) => {
				assert_eq!(order, 12);
				assert_eq!(status, OrderStatus::OutForDelivery);
				assert_eq!(restaurant, 3);
			},
			other => panic!("unexpected command {:?}", other),
		}
	}

	#[test]
	fn test_args_default_to_serve() {
		let args = Args::parse_from(["cosmic-cart", "-l", "debug"]);
		assert!(args.command.is_none());
		assert_eq!(args.log_level, "debug");
		assert!(Args::try_parse_from(["cosmic-cart", "flow", "--status", "SHIPPED"]).is_err());
	}

	#[test]
	fn test_storage_factory_map() {
		let factories = create_factory_map!(
			cart_storage::StorageInterface,
			cart_storage::StorageError,
			"file" => create_file_storage,
			"memory" => create_memory_storage,
		);
		assert_eq!(factories.len(), 2);
		assert!(factories.contains_key("file"));
		assert!(factories.contains_key("memory"));
	}

	#[tokio::test]
	async fn test_build_order_service_from_file_config() {
		let dir = tempdir().unwrap();
		let config_path = dir.path().join("config.toml");
		let storage_path = dir.path().join("orders");
		std::fs::write(
			&config_path,
			format!(
				r#"
[service]
id = "cart-file-test"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{}"
"#,
				storage_path.display()
			),
		)
		.unwrap();

		let config = Config::from_file(&config_path).await.unwrap();
		let machine = build_order_service(config).unwrap();
		let orders = machine.list_restaurant_orders(1).await.unwrap();
		assert!(orders.is_empty());
	}
}
