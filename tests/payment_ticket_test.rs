mod common;

use common::{draft, tomorrow};
use tripdesk::{
    domain::{BookingPaymentStatus, PaymentMethod, PaymentStatus, Role},
    error::AppError,
    service::PaymentRequest,
};

fn pay(booking_id: uuid::Uuid) -> PaymentRequest {
    PaymentRequest {
        booking_id,
        method: PaymentMethod::Card,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_ticket_requires_payment_and_issues_once() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let ctx = &t.ctx;

    let booking = ctx.booking_service.create(&alice, trip.id, vec![1, 2]).await?;

    assert!(matches!(
        ctx.ticket_service.issue(&alice, booking.id).await,
        Err(AppError::NotPaid)
    ));

    let (payment, _) = ctx.payment_service.create(&alice, pay(booking.id)).await?;
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(payment.transaction_id.starts_with("PAY-"));
    assert_eq!(payment.amount_cents, 2 * 45_000);

    // Still pending: no ticket yet.
    assert!(matches!(
        ctx.ticket_service.issue(&alice, booking.id).await,
        Err(AppError::NotPaid)
    ));

    let (payment, paid) = ctx.payment_service.mark_success(&alice, payment.id).await?;
    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(paid.payment_status, BookingPaymentStatus::Paid);

    let ticket = ctx.ticket_service.issue(&alice, booking.id).await?;
    assert_eq!(ticket.booking_id, booking.id);
    assert_eq!(ticket.seats, vec![1, 2]);
    assert!(ticket.issuance_code.starts_with("TKT-"));

    assert!(matches!(
        ctx.ticket_service.issue(&alice, booking.id).await,
        Err(AppError::TicketAlreadyIssued)
    ));

    // ensure_issued hands back the existing ticket.
    let again = ctx.ticket_service.ensure_issued(&alice, booking.id).await?;
    assert_eq!(again.id, ticket.id);

    Ok(())
}

#[tokio::test]
async fn test_mark_success_is_idempotent() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let ctx = &t.ctx;

    let booking = ctx.booking_service.create(&alice, trip.id, vec![4]).await?;
    let (payment, _) = ctx.payment_service.create(&alice, pay(booking.id)).await?;

    let (first, _) = ctx.payment_service.mark_success(&alice, payment.id).await?;
    let (second, booking_after) = ctx.payment_service.mark_success(&alice, payment.id).await?;

    assert_eq!(first.status, PaymentStatus::Success);
    assert_eq!(second.status, PaymentStatus::Success);
    assert_eq!(second.updated_at, first.updated_at);
    assert_eq!(booking_after.payment_status, BookingPaymentStatus::Paid);

    // A settled payment cannot flip.
    assert!(matches!(
        ctx.payment_service.mark_failed(&alice, payment.id).await,
        Err(AppError::Conflict(_))
    ));

    // A paid booking takes no further attempts.
    assert!(matches!(
        ctx.payment_service.create(&alice, pay(booking.id)).await,
        Err(AppError::AlreadyPaid)
    ));

    Ok(())
}

#[tokio::test]
async fn test_failed_attempt_then_retry() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let ctx = &t.ctx;

    let booking = ctx.booking_service.create(&alice, trip.id, vec![7]).await?;

    let (attempt, _) = ctx.payment_service.create(&alice, pay(booking.id)).await?;
    let (failed, booking_after) = ctx.payment_service.mark_failed(&alice, attempt.id).await?;
    assert_eq!(failed.status, PaymentStatus::Failed);
    assert_eq!(booking_after.payment_status, BookingPaymentStatus::Failed);

    assert!(matches!(
        ctx.payment_service.mark_success(&alice, attempt.id).await,
        Err(AppError::Conflict(_))
    ));

    let (retry, _) = ctx.payment_service.create(&alice, pay(booking.id)).await?;
    let (_, paid) = ctx.payment_service.mark_success(&alice, retry.id).await?;
    assert_eq!(paid.payment_status, BookingPaymentStatus::Paid);

    let attempts = ctx.payment_service.list_for_booking(&alice, booking.id).await?;
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].id, retry.id);

    Ok(())
}

#[tokio::test]
async fn test_second_attempt_cannot_pay_twice() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let ctx = &t.ctx;

    let booking = ctx.booking_service.create(&alice, trip.id, vec![1]).await?;
    let (a, _) = ctx.payment_service.create(&alice, pay(booking.id)).await?;
    let (b, _) = ctx.payment_service.create(&alice, pay(booking.id)).await?;

    ctx.payment_service.mark_success(&alice, a.id).await?;
    assert!(matches!(
        ctx.payment_service.mark_success(&alice, b.id).await,
        Err(AppError::AlreadyPaid)
    ));

    let b_after = ctx.payment_service.get(&alice, b.id).await?;
    assert_eq!(b_after.status, PaymentStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn test_one_step_confirm() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let ctx = &t.ctx;

    let booking = ctx.booking_service.create(&alice, trip.id, vec![9]).await?;

    let request = PaymentRequest {
        booking_id: booking.id,
        ..Default::default()
    };
    let (payment, paid) = ctx.payment_service.confirm(&alice, request).await?;
    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(payment.method, PaymentMethod::Mock);
    assert!(payment.transaction_id.starts_with("MOCK-"));
    assert_eq!(paid.payment_status, BookingPaymentStatus::Paid);

    let ticket = ctx.ticket_service.ensure_issued(&alice, booking.id).await?;
    let view = ctx.ticket_service.view(&alice, ticket.id).await?;
    assert_eq!(view.booking.id, booking.id);
    assert_eq!(view.trip.as_ref().map(|t| t.destination.as_str()), Some("Mumbai"));
    assert!(view.user.is_some());

    Ok(())
}

#[tokio::test]
async fn test_payment_guards() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let mallory = t.user("Mallory", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let ctx = &t.ctx;

    let booking = ctx.booking_service.create(&alice, trip.id, vec![1]).await?;

    assert!(matches!(
        ctx.payment_service.create(&mallory, pay(booking.id)).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        ctx.payment_service.create(&alice, pay(uuid::Uuid::new_v4())).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        ctx.payment_service.mark_success(&alice, uuid::Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));

    let (payment, _) = ctx
        .payment_service
        .create(
            &alice,
            PaymentRequest {
                booking_id: booking.id,
                method: PaymentMethod::Upi,
                transaction_id: Some("UPI-123".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(payment.transaction_id, "UPI-123");

    assert!(matches!(
        ctx.payment_service
            .create(
                &alice,
                PaymentRequest {
                    booking_id: booking.id,
                    method: PaymentMethod::Upi,
                    transaction_id: Some("UPI-123".to_string()),
                    ..Default::default()
                },
            )
            .await,
        Err(AppError::Conflict(_))
    ));

    assert!(matches!(ctx.payment_service.get(&mallory, payment.id).await, Err(AppError::Forbidden)));
    assert!(matches!(ctx.payment_service.list_all(&alice).await, Err(AppError::Forbidden)));
    assert_eq!(ctx.payment_service.list_all(&admin).await?.len(), 1);

    // Cancelled bookings take no payments, pending attempts cannot settle.
    ctx.booking_service.cancel(&alice, booking.id).await?;
    assert!(matches!(
        ctx.payment_service.create(&alice, pay(booking.id)).await,
        Err(AppError::AlreadyCancelled)
    ));
    assert!(matches!(
        ctx.payment_service.mark_success(&alice, payment.id).await,
        Err(AppError::AlreadyCancelled)
    ));

    Ok(())
}

#[tokio::test]
async fn test_cancel_after_payment_marks_refunded() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let ctx = &t.ctx;

    let booking = ctx.booking_service.create(&alice, trip.id, vec![1, 2, 3]).await?;
    ctx.payment_service
        .confirm(&alice, PaymentRequest { booking_id: booking.id, ..Default::default() })
        .await?;

    let cancelled = ctx.booking_service.cancel(&alice, booking.id).await?;
    assert_eq!(cancelled.payment_status, BookingPaymentStatus::Refunded);
    assert_eq!(t.available_seats(trip.id).await?, 10);

    Ok(())
}

#[tokio::test]
async fn test_ticket_access() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let mallory = t.user("Mallory", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let ctx = &t.ctx;

    let booking = ctx.booking_service.create(&alice, trip.id, vec![1]).await?;

    assert!(matches!(
        ctx.ticket_service.view_for_booking(&alice, booking.id).await,
        Err(AppError::NotPaid)
    ));

    ctx.payment_service
        .confirm(&alice, PaymentRequest { booking_id: booking.id, ..Default::default() })
        .await?;

    // The download path issues the ticket on first use.
    let view = ctx.ticket_service.view_for_booking(&alice, booking.id).await?;
    assert!(matches!(
        ctx.ticket_service.view(&mallory, view.ticket.id).await,
        Err(AppError::Forbidden)
    ));
    assert!(ctx.ticket_service.view(&admin, view.ticket.id).await.is_ok());
    assert!(matches!(
        ctx.ticket_service.view_for_booking(&mallory, booking.id).await,
        Err(AppError::Forbidden)
    ));

    assert!(matches!(ctx.ticket_service.list_all(&alice).await, Err(AppError::Forbidden)));
    assert_eq!(ctx.ticket_service.list_all(&admin).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_amount_is_booking_total() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let trip = t.trip(&admin, 10, 10).await?;
    let ctx = &t.ctx;

    let booking = ctx.booking_service.create(&alice, trip.id, vec![1, 2, 3]).await?;
    let with_amount = |amount| PaymentRequest {
        booking_id: booking.id,
        amount_cents: Some(amount),
        ..Default::default()
    };

    assert!(matches!(
        ctx.payment_service.create(&alice, with_amount(-1)).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        ctx.payment_service.create(&alice, with_amount(1_000)).await,
        Err(AppError::Validation(_))
    ));
    assert!(ctx.payment_service.list_for_booking(&alice, booking.id).await?.is_empty());

    let (payment, _) = ctx.payment_service.create(&alice, with_amount(3 * 45_000)).await?;
    assert_eq!(payment.amount_cents, 135_000);

    // Omitting the amount stores the same derived total.
    let (payment, _) = ctx.payment_service.create(&alice, pay(booking.id)).await?;
    assert_eq!(payment.amount_cents, 135_000);

    Ok(())
}

#[tokio::test]
async fn test_total_overflow_is_rejected() -> anyhow::Result<()> {
    let t = common::setup().await?;
    let admin = t.admin().await?;
    let alice = t.user("Alice", Role::User).await?;
    let ctx = &t.ctx;

    let trip = ctx
        .trip_service
        .create(&admin, draft("Pune", "Goa", tomorrow(), 10, None, i64::MAX / 2 + 1))
        .await?;
    let booking = ctx.booking_service.create(&alice, trip.id, vec![1, 2]).await?;

    assert!(matches!(
        ctx.payment_service.create(&alice, pay(booking.id)).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        ctx.payment_service
            .confirm(&alice, PaymentRequest { booking_id: booking.id, ..Default::default() })
            .await,
        Err(AppError::Validation(_))
    ));

    // A single seat at the same price stays in range.
    let single = ctx.booking_service.create(&alice, trip.id, vec![5]).await?;
    let (payment, _) = ctx.payment_service.create(&alice, pay(single.id)).await?;
    assert_eq!(payment.amount_cents, i64::MAX / 2 + 1);

    Ok(())
}
