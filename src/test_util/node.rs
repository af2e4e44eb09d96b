use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::cluster::member::{Member, MemberStatus};
use crate::cluster::node_addr::NodeAddr;

/// convenience method for unit test code: create a [NodeAddr] based on a number, the same number
///  generating the same address and different numbers different addresses. Lower numbers give
///  lower addresses.
pub fn test_node_addr_from_number(number: u16) -> NodeAddr {
    NodeAddr {
        socket_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, number)),
        unique: number.into(),
    }
}

pub fn test_member(number: u16, status: MemberStatus, up_number: u32) -> Member {
    test_member_with_roles(number, &[], status, up_number)
}

pub fn test_member_with_roles(number: u16, roles: &[&str], status: MemberStatus, up_number: u32) -> Member {
    Member::new(
        test_node_addr_from_number(number),
        roles.iter().map(|r| r.to_string()).collect(),
        status,
        up_number,
    )
}

/// an 'Up' member whose up number is its node number, i.e. lower numbers are older
pub fn test_up_member(number: u16) -> Member {
    test_member(number, MemberStatus::Up, number.into())
}
