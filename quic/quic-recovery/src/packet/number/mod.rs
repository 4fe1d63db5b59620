// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//= https://www.rfc-editor.org/rfc/rfc9000#section-12.3
//# The packet number is an integer in the range 0 to 2^62-1.  This
//# number is used in determining the cryptographic nonce for packet
//# protection.  Each endpoint maintains a separate packet number for
//# sending and receiving.

mod packet_number;
pub use packet_number::PacketNumber;

mod packet_number_space;
pub use packet_number_space::PacketNumberSpace;

mod packet_number_len;
pub use packet_number_len::PacketNumberLen;

mod truncated_packet_number;
pub use truncated_packet_number::TruncatedPacketNumber;

mod packet_numbers;
pub use packet_numbers::PacketNumbers;

mod map;
pub use map::SpaceMap;


//= https://www.rfc-editor.org/rfc/rfc9000#section-17.1
//# The sender MUST use a packet number size able to represent more than
//# twice as large a range than the difference between the largest
//# acknowledged packet and packet number being sent.

fn derive_truncation_range(
    largest_acknowledged_packet_number: PacketNumber,
    packet_number: PacketNumber,
) -> Option<PacketNumberLen> {
    packet_number
        .space()
        .assert_eq(largest_acknowledged_packet_number.space());
    packet_number
        .checked_distance(largest_acknowledged_packet_number)
        .and_then(|value| value.checked_mul(2))
        .and_then(PacketNumberLen::for_range)
}

//= https://www.rfc-editor.org/rfc/rfc9000#appendix-A.3
//# DecodePacketNumber(largest_pn, truncated_pn, pn_nbits):
//#    expected_pn  = largest_pn + 1
//#    pn_win       = 1 << pn_nbits
//#    pn_hwin      = pn_win / 2
//#    pn_mask      = pn_win - 1
//#    // The incoming packet number should be greater than
//#    // expected_pn - pn_hwin and less than or equal to
//#    // expected_pn + pn_hwin
//#    //
//#    // This means we cannot just strip the trailing bits from
//#    // expected_pn and add the truncated_pn because that might
//#    // yield a value outside the window.
//#    //
//#    // The following code calculates a candidate value and
//#    // makes sure it's within the packet number window.
//#    // Note the extra checks to prevent overflow and underflow.
//#    candidate_pn = (expected_pn & ~pn_mask) | truncated_pn
//#    if candidate_pn <= expected_pn - pn_hwin and
//#       candidate_pn < (1 << 62) - pn_win:
//#       return candidate_pn + pn_win
//#    if candidate_pn > expected_pn + pn_hwin and
//#       candidate_pn >= pn_win:
//#       return candidate_pn - pn_win
//#    return candidate_pn

/// Decodes `truncated_pn` relative to the next expected packet number
fn decode_packet_number(
    space: PacketNumberSpace,
    expected_pn: u64,
    truncated_pn: TruncatedPacketNumber,
) -> Option<PacketNumber> {
    space.assert_eq(truncated_pn.space());

    let pn_nbits = truncated_pn.len().bitsize();
    let pn_win = 1u64 << pn_nbits;
    let pn_hwin = pn_win / 2;
    let pn_mask = pn_win - 1;
    let candidate_pn = (expected_pn & !pn_mask) | truncated_pn.as_u64();

    let value = if expected_pn
        .checked_sub(pn_hwin)
        .is_some_and(|window| candidate_pn <= window)
        && candidate_pn < (PacketNumber::MAX_VALUE + 1) - pn_win
    {
        candidate_pn + pn_win
    } else if candidate_pn > expected_pn.saturating_add(pn_hwin) && candidate_pn >= pn_win {
        candidate_pn - pn_win
    } else {
        candidate_pn
    };

    PacketNumber::new(space, value)
}
