//! Deterministic assignment of recipients to send attempts.

use crate::error::EngineError;

/// Partitions `recipients` into exactly `total_attempts` groups.
///
/// With more recipients than attempts, the list is split into contiguous
/// near-equal groups (sizes differ by at most one, larger groups first) so
/// every address is covered and no group is empty. With fewer recipients
/// than attempts, the list is repeated cyclically with one address per
/// group. Output is identical for identical inputs.
///
/// # Errors
///
/// Fails with [`EngineError::NoRecipients`] on an empty recipient list and
/// [`EngineError::InvalidShape`] when `total_attempts` is zero; both are
/// configuration errors caught before any send is dispatched.
pub fn distribute(
    recipients: &[String],
    total_attempts: usize,
) -> Result<Vec<Vec<String>>, EngineError> {
    if recipients.is_empty() {
        return Err(EngineError::NoRecipients);
    }
    if total_attempts == 0 {
        return Err(EngineError::InvalidShape(
            "total attempts must be at least 1".to_string(),
        ));
    }

    if recipients.len() > total_attempts {
        let base = recipients.len() / total_attempts;
        let extra = recipients.len() % total_attempts;

        let mut groups = Vec::with_capacity(total_attempts);
        let mut start = 0;
        for index in 0..total_attempts {
            let size = base + usize::from(index < extra);
            groups.push(recipients[start..start + size].to_vec());
            start += size;
        }
        Ok(groups)
    } else {
        Ok(recipients
            .iter()
            .cycle()
            .take(total_attempts)
            .map(|address| vec![address.clone()])
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn addresses(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user{i}@example.com")).collect()
    }

    #[test]
    fn batches_when_more_recipients_than_attempts() {
        let recipients = addresses(5);
        let groups = distribute(&recipients, 2).unwrap();

        assert_eq!(
            groups,
            vec![
                vec![
                    "user0@example.com".to_string(),
                    "user1@example.com".to_string(),
                    "user2@example.com".to_string(),
                ],
                vec![
                    "user3@example.com".to_string(),
                    "user4@example.com".to_string(),
                ],
            ]
        );
    }

    #[test]
    fn cycles_when_fewer_recipients_than_attempts() {
        let recipients = addresses(2);
        let groups = distribute(&recipients, 3).unwrap();

        assert_eq!(
            groups,
            vec![
                vec!["user0@example.com".to_string()],
                vec!["user1@example.com".to_string()],
                vec!["user0@example.com".to_string()],
            ]
        );
    }

    #[test]
    fn exact_fit_yields_singletons() {
        let recipients = addresses(4);
        let groups = distribute(&recipients, 4).unwrap();

        assert_eq!(groups.len(), 4);
        assert!(groups.iter().all(|group| group.len() == 1));
    }

    #[test]
    fn covers_every_address_with_no_empty_group() {
        for recipient_count in 1..=40 {
            for total_attempts in 1..=25 {
                let recipients = addresses(recipient_count);
                let groups = distribute(&recipients, total_attempts).unwrap();

                assert_eq!(groups.len(), total_attempts);
                assert!(groups.iter().all(|group| !group.is_empty()));

                for address in &recipients {
                    assert!(
                        groups.iter().any(|group| group.contains(address)),
                        "address {address} missing for {recipient_count}/{total_attempts}"
                    );
                }
            }
        }
    }

    #[test]
    fn group_sizes_differ_by_at_most_one() {
        let recipients = addresses(17);
        let groups = distribute(&recipients, 5).unwrap();

        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 17);
        assert_eq!(*sizes.iter().max().unwrap(), 4);
        assert_eq!(*sizes.iter().min().unwrap(), 3);
    }

    #[test]
    fn deterministic() {
        let recipients = addresses(13);
        assert_eq!(
            distribute(&recipients, 7).unwrap(),
            distribute(&recipients, 7).unwrap()
        );
    }

    #[test]
    fn empty_recipient_list_is_an_error() {
        assert!(matches!(
            distribute(&[], 4),
            Err(EngineError::NoRecipients)
        ));
    }

    #[test]
    fn zero_attempts_is_an_error() {
        let recipients = addresses(2);
        assert!(matches!(
            distribute(&recipients, 0),
            Err(EngineError::InvalidShape(_))
        ));
    }
}
