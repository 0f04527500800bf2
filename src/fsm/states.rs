//! Concrete operation handlers and table builder.
//!
//! Each operation is three plain `fn` pointers.  Handlers only touch the
//! [`MotorContext`]; drive requests and milestones go through its outbox.
//!
//! ```text
//!                 ┌────────── tap / tap_card1 ──────────┐
//!                 │                                     ▼
//!  IDLE ◀──[return done]── MOVING_TO_MIDDLE ◀──[pause]── TAPPING_CARDn
//!    │                        ▲                          ▲
//!    │  reset / capture ──────┘                          │
//!    │                                   [approach]──────┘
//!    └──────────── tap_cardn ──▶ MOVING_TO_CARDn
//!
//!  manual_extend / manual_retract ──▶ MANUAL_OPERATION ──[manual_stop]──▶ IDLE
//! ```

use super::context::{Card, CoreEvent, DriveState, MotorContext, Position, ReturnLeg};
use super::{Operation, StateDescriptor};
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static operation table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; Operation::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: Operation::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: MovingToMiddle
        StateDescriptor {
            id: Operation::MovingToMiddle,
            name: "MovingToMiddle",
            on_enter: Some(moving_to_middle_enter),
            on_exit: None,
            on_update: moving_to_middle_update,
        },
        // Index 2: MovingToCard1
        StateDescriptor {
            id: Operation::MovingToCard1,
            name: "MovingToCard1",
            on_enter: Some(moving_to_card1_enter),
            on_exit: None,
            on_update: moving_to_card1_update,
        },
        // Index 3: MovingToCard2
        StateDescriptor {
            id: Operation::MovingToCard2,
            name: "MovingToCard2",
            on_enter: Some(moving_to_card2_enter),
            on_exit: None,
            on_update: moving_to_card2_update,
        },
        // Index 4: TappingCard1
        StateDescriptor {
            id: Operation::TappingCard1,
            name: "TappingCard1",
            on_enter: Some(tapping_card1_enter),
            on_exit: None,
            on_update: tapping_update,
        },
        // Index 5: TappingCard2
        StateDescriptor {
            id: Operation::TappingCard2,
            name: "TappingCard2",
            on_enter: Some(tapping_card2_enter),
            on_exit: None,
            on_update: tapping_update,
        },
        // Index 6: ManualOperation
        StateDescriptor {
            id: Operation::ManualOperation,
            name: "ManualOperation",
            on_enter: Some(manual_enter),
            on_exit: Some(manual_exit),
            on_update: manual_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut MotorContext) {
    ctx.set_drive(DriveState::Idle);
    ctx.tap_card = None;
    info!("IDLE: position {}", ctx.position.label());
}

fn idle_update(_ctx: &mut MotorContext) -> Option<Operation> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  MOVING_TO_MIDDLE: timed return, or two-phase recovery from unknown
// ═══════════════════════════════════════════════════════════════════════════

fn moving_to_middle_enter(ctx: &mut MotorContext) {
    match ctx.position {
        Position::Card1 => begin_return(ctx, Card::One),
        Position::Card2 => begin_return(ctx, Card::Two),
        Position::Unknown | Position::Middle => {
            // No trustworthy start point: seat on the retracted end stop first.
            let full = ctx.profile().retract_full_ms;
            ctx.return_leg = ReturnLeg::RecoveryRetract;
            ctx.set_drive(DriveState::Retracting);
            ctx.start_phase(full);
            info!("MOVING_TO_MIDDLE: recovery, full retract for {}ms", full);
        }
    }
}

fn begin_return(ctx: &mut MotorContext, card: Card) {
    let ms = ctx.return_ms(card);
    ctx.return_leg = ReturnLeg::FromCard(card);
    ctx.set_drive(card.return_drive());
    ctx.start_phase(ms);
    info!("MOVING_TO_MIDDLE: from {} for {}ms", card, ms);
}

fn moving_to_middle_update(ctx: &mut MotorContext) -> Option<Operation> {
    if !ctx.phase_expired() {
        return None;
    }

    match ctx.return_leg {
        ReturnLeg::FromCard(card) => {
            ctx.position = Position::Middle;
            if ctx.tap_card == Some(card) {
                let accumulated_ms = ctx.drift.record_tap(card);
                ctx.push(CoreEvent::DriftUpdated {
                    card,
                    accumulated_ms,
                });
            }
            ctx.push(CoreEvent::ReturnedToMiddle { from: Some(card) });
            Some(Operation::Idle)
        }
        ReturnLeg::RecoveryRetract => {
            let half = ctx.profile().home_from_retracted_ms;
            ctx.return_leg = ReturnLeg::RecoveryApproach;
            ctx.set_drive(DriveState::Extending);
            ctx.start_phase(half);
            ctx.push(CoreEvent::RecoveryRetracted);
            info!("MOVING_TO_MIDDLE: at retracted stop, extending {}ms", half);
            None
        }
        ReturnLeg::RecoveryApproach => {
            ctx.position = Position::Middle;
            ctx.push(CoreEvent::ReturnedToMiddle { from: None });
            Some(Operation::Idle)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  MOVING_TO_CARDn: timed approach from middle
// ═══════════════════════════════════════════════════════════════════════════

fn begin_approach(ctx: &mut MotorContext, card: Card) {
    let ms = ctx.approach_ms(card);
    ctx.tap_card = Some(card);
    ctx.set_drive(card.approach_drive());
    ctx.start_phase(ms);
    info!("MOVING_TO_{}: {} for {}ms", card.label(), card.approach_drive().label(), ms);
}

fn approach_update(ctx: &mut MotorContext, card: Card, next: Operation) -> Option<Operation> {
    if !ctx.phase_expired() {
        return None;
    }
    ctx.position = card.position();
    ctx.push(CoreEvent::ReachedCard(card));
    Some(next)
}

fn moving_to_card1_enter(ctx: &mut MotorContext) {
    begin_approach(ctx, Card::One);
}

fn moving_to_card1_update(ctx: &mut MotorContext) -> Option<Operation> {
    approach_update(ctx, Card::One, Operation::TappingCard1)
}

fn moving_to_card2_enter(ctx: &mut MotorContext) {
    begin_approach(ctx, Card::Two);
}

fn moving_to_card2_update(ctx: &mut MotorContext) -> Option<Operation> {
    approach_update(ctx, Card::Two, Operation::TappingCard2)
}

// ═══════════════════════════════════════════════════════════════════════════
//  TAPPING_CARDn: motor off, dwell against the card
// ═══════════════════════════════════════════════════════════════════════════

fn begin_dwell(ctx: &mut MotorContext, card: Card) {
    let ms = ctx.pause_ms(card);
    ctx.set_drive(DriveState::Idle);
    ctx.start_phase(ms);
    debug!("TAPPING: holding {} for {}ms", card, ms);
}

fn tapping_card1_enter(ctx: &mut MotorContext) {
    begin_dwell(ctx, Card::One);
}

fn tapping_card2_enter(ctx: &mut MotorContext) {
    begin_dwell(ctx, Card::Two);
}

fn tapping_update(ctx: &mut MotorContext) -> Option<Operation> {
    ctx.phase_expired().then_some(Operation::MovingToMiddle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  MANUAL_OPERATION: open-ended drive until manual_stop
// ═══════════════════════════════════════════════════════════════════════════

fn manual_enter(ctx: &mut MotorContext) {
    ctx.position = Position::Unknown;
    ctx.manual_timing_start = Some(ctx.now);
    let direction = ctx.manual_direction;
    ctx.set_drive(direction);
    info!("MANUAL: {} started, timing measurement armed", direction.label());
}

fn manual_update(_ctx: &mut MotorContext) -> Option<Operation> {
    None
}

fn manual_exit(ctx: &mut MotorContext) {
    ctx.manual_timing_start = None;
}
