//! Order status transition policy.
//!
//! Single source of truth for which status changes are legal and for the
//! guidance shown when one is not. Orders move forward along
//! PENDING -> ACCEPTED -> IN_COOKING -> OUT_FOR_DELIVERY -> COMPLETED, may be
//! DECLINED or CANCELLED from any active stage, and a DECLINED order may only
//! be CANCELLED (to mark it for deletion). COMPLETED and CANCELLED are final.
//!
//! The policy is a pure function of the transition graph. It is consulted by
//! the dashboard as a pre-check and by the order service as the authoritative
//! check before a change is persisted.

use cart_types::{OrderStatus, StatusOption, TransitionRequest, TransitionResult};

/// Stateless transition policy over the closed [`OrderStatus`] set.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderStatusPolicy;

impl OrderStatusPolicy {
	pub fn new() -> Self {
		Self
	}

	/// Statuses reachable from `current` in one step, excluding `current` itself.
	pub fn allowed_next(&self, current: OrderStatus) -> &'static [OrderStatus] {
		use OrderStatus::*;
		match current {
			Pending => &[Accepted, Declined, Cancelled],
			Accepted => &[InCooking, Declined, Cancelled],
			InCooking => &[OutForDelivery, Declined, Cancelled],
			OutForDelivery => &[Completed, Declined, Cancelled],
			Declined => &[Cancelled],
			Completed | Cancelled => &[],
		}
	}

	/// Returns true if an order may move from `current` to `requested`.
	///
	/// Requesting the current status is a no-op and always allowed.
	pub fn is_transition_allowed(&self, current: OrderStatus, requested: OrderStatus) -> bool {
		current == requested || self.allowed_next(current).contains(&requested)
	}

	/// Checks a transition request, attaching flow guidance when it is rejected.
	pub fn validate(&self, request: TransitionRequest) -> TransitionResult {
		let TransitionRequest {
			current_status,
			requested_status,
		} = request;

		if self.is_transition_allowed(current_status, requested_status) {
			TransitionResult::allowed()
		} else {
			TransitionResult::rejected(format!(
				"Order flow: {}",
				self.explain_rejection(current_status, requested_status)
			))
		}
	}

	/// Explains why moving from `current` to `requested` is not permitted.
	///
	/// Meant for pairs rejected by [`is_transition_allowed`](Self::is_transition_allowed);
	/// for any other pair it returns the valid next steps for `current`.
	/// The result is never empty.
	pub fn explain_rejection(&self, current: OrderStatus, requested: OrderStatus) -> String {
		use OrderStatus::*;

		if self.is_transition_allowed(current, requested) {
			return next_steps(current).to_string();
		}

		match (current, requested) {
			(Pending, Completed) => "Cannot complete a pending order. Pending orders must be \
				ACCEPTED first, then follow the flow: ACCEPTED → IN_COOKING → \
				OUT_FOR_DELIVERY → COMPLETED."
				.to_string(),
			(Pending, InCooking) => "Cannot start cooking a pending order. Pending orders \
				must be ACCEPTED first, then moved to IN_COOKING."
				.to_string(),
			(Pending, OutForDelivery) => "Cannot deliver a pending order. Pending orders must \
				go ACCEPTED → IN_COOKING → OUT_FOR_DELIVERY."
				.to_string(),

			(Accepted, Completed) => "Cannot complete an accepted order directly. Follow the \
				flow: ACCEPTED → IN_COOKING → OUT_FOR_DELIVERY → COMPLETED."
				.to_string(),
			(Accepted, OutForDelivery) => "Cannot deliver without cooking. Accepted orders \
				must go to IN_COOKING first, then OUT_FOR_DELIVERY."
				.to_string(),
			(Accepted, Pending) => "Cannot go back to PENDING. Once accepted, orders must \
				move forward in the flow."
				.to_string(),

			(InCooking, Completed) => "Cannot complete an order that is still cooking. It must \
				go OUT_FOR_DELIVERY first, then COMPLETED."
				.to_string(),
			(InCooking, earlier @ (Pending | Accepted)) => format!(
				"Cannot go back to {}. Cooking orders must move forward to OUT_FOR_DELIVERY.",
				earlier
			),

			(OutForDelivery, earlier @ (Pending | Accepted | InCooking)) => format!(
				"Cannot go back to {}. Orders out for delivery must be COMPLETED, DECLINED \
				 or CANCELLED.",
				earlier
			),

			(Declined, Completed) => "Cannot complete a declined order. Declined orders \
				cannot be reactivated and can only be CANCELLED for deletion."
				.to_string(),
			(Declined, _) => "Declined orders cannot be reactivated. They can only be \
				CANCELLED for deletion."
				.to_string(),

			(Completed, target) => format!(
				"Completed orders are final. Cannot change a completed order to {}.",
				target
			),
			(Cancelled, target) => format!(
				"Cancelled orders are final. Cannot change a cancelled order to {}.",
				target
			),

			(current, _) => next_steps(current).to_string(),
		}
	}

	/// Lists every status other than `current`, in canonical order, flagged
	/// with whether it can be selected.
	pub fn list_selectable_next_statuses(&self, current: OrderStatus) -> Vec<StatusOption> {
		OrderStatus::ALL
			.into_iter()
			.filter(|status| *status != current)
			.map(|status| StatusOption::new(status, self.is_transition_allowed(current, status)))
			.collect()
	}

	/// One-line picture of the remaining path from `current`.
	pub fn flow_diagram(&self, current: OrderStatus) -> String {
		match current {
			OrderStatus::Declined => "Flow: DECLINED → CANCELLED (for deletion only)".to_string(),
			OrderStatus::Completed | OrderStatus::Cancelled => {
				format!("Flow: {} (final state, no changes allowed)", current)
			},
			_ => {
				let start = current.pipeline_position().unwrap_or(0);
				let path = OrderStatus::PIPELINE[start..]
					.iter()
					.map(OrderStatus::as_str)
					.collect::<Vec<_>>()
					.join(" → ");
				format!(
					"Flow: {}\n   or: {} → DECLINED/CANCELLED",
					path, current
				)
			},
		}
	}

	/// Guide listing every valid transition, the invalid kinds and usage tips.
	pub fn complete_flow_guide(&self) -> String {
		let mut guide = String::from("COMPLETE ORDER FLOW GUIDE\n\nVALID TRANSITIONS:\n");

		for from in OrderStatus::ALL {
			let next = self.allowed_next(from);
			if next.is_empty() {
				continue;
			}
			for to in next {
				guide.push_str(&format!(
					"• {} → {} ({})\n",
					from,
					to,
					transition_purpose(from, *to)
				));
			}
			guide.push('\n');
		}

		guide.push_str(
			"INVALID TRANSITIONS:\n\
			 • Cannot skip steps (e.g. PENDING → COMPLETED)\n\
			 • Cannot go backwards (e.g. IN_COOKING → PENDING)\n\
			 • Cannot change final states (COMPLETED, CANCELLED)\n\
			 • Cannot reactivate declined orders\n\n\
			 TIPS:\n\
			 • Follow the flow: PENDING → ACCEPTED → IN_COOKING → OUT_FOR_DELIVERY → COMPLETED\n\
			 • Use DECLINED if you cannot fulfil the order\n\
			 • Use CANCELLED for customer cancellations or deletion\n\
			 • Once COMPLETED or CANCELLED, orders cannot be changed",
		);
		guide
	}

	/// Everything the dashboard shows for the "order flow" info button.
	pub fn status_info(&self, current: OrderStatus) -> String {
		format!(
			"{}\n\n{}\n\n{}",
			next_steps(current),
			self.flow_diagram(current),
			self.complete_flow_guide()
		)
	}
}

/// Default guidance for a status: what it can move to next.
fn next_steps(current: OrderStatus) -> &'static str {
	match current {
		OrderStatus::Pending => {
			"Pending orders can be ACCEPTED (to start processing), DECLINED (if you cannot \
			 fulfil them) or CANCELLED (if the customer cancels)."
		},
		OrderStatus::Accepted => {
			"Accepted orders can be moved to IN_COOKING (to start preparation), DECLINED (if \
			 you cannot fulfil them) or CANCELLED."
		},
		OrderStatus::InCooking => {
			"Cooking orders can be moved to OUT_FOR_DELIVERY (when ready), DECLINED (if you \
			 cannot fulfil them) or CANCELLED."
		},
		OrderStatus::OutForDelivery => {
			"Orders out for delivery can be COMPLETED (when delivered), DECLINED (if delivery \
			 fails) or CANCELLED."
		},
		OrderStatus::Declined => {
			"Declined orders cannot be reactivated. They can only be changed to CANCELLED for \
			 deletion."
		},
		OrderStatus::Completed => {
			"Completed orders are final and cannot be changed. This protects the order history."
		},
		OrderStatus::Cancelled => "Cancelled orders are final and cannot be changed.",
	}
}

fn transition_purpose(from: OrderStatus, to: OrderStatus) -> &'static str {
	use OrderStatus::*;
	match (from, to) {
		(Pending, Accepted) => "start processing",
		(Accepted, InCooking) => "start preparation",
		(InCooking, OutForDelivery) => "ready for delivery",
		(OutForDelivery, Completed) => "delivered successfully",
		(OutForDelivery, Declined) => "delivery failed",
		(_, Declined) => "cannot fulfil",
		(Pending, Cancelled) => "customer cancels",
		(OutForDelivery, Cancelled) => "cancel delivery",
		(Declined, Cancelled) => "for deletion only",
		(_, Cancelled) => "cancel order",
		_ => "not allowed",
	}
}
