//! Sucker contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the sucker
//! registry, the sucker itself, the deployer probes, and ERC-20 tokens.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// One declared pairing: the local sucker, its remote counterpart, and
    /// the chain the counterpart lives on
    struct SuckerPairData {
        address local;
        address remote;
        uint256 remoteChainId;
    }

    /// Incremental merkle accumulator of queued transfers
    struct MerkleTreeData {
        bytes32[32] branch;
        uint256 count;
    }

    /// Per-token outbound queue state
    ///
    /// IMPORTANT: must match the Solidity outbox struct exactly;
    /// `numberOfClaimsSent` is the relay counter transfers are compared
    /// against.
    struct OutboxTreeData {
        uint64 nonce;
        uint256 balance;
        MerkleTreeData tree;
        uint256 numberOfClaimsSent;
    }

    /// Merkle leaf of a claimable transfer
    struct ClaimLeafData {
        uint256 index;
        address beneficiary;
        uint256 projectTokenCount;
        uint256 terminalTokenAmount;
    }

    /// Full claim payload validated by the destination sucker
    struct ClaimData {
        address token;
        ClaimLeafData leaf;
        bytes32[32] proof;
    }

    /// Registry mapping projects to their declared sucker pairs per chain
    #[sol(rpc)]
    contract SuckerRegistry {
        /// All pairs declared for a project on this chain
        function pairsOfProject(uint256 projectId) external view returns (SuckerPairData[] memory pairs);

        /// Whether the address is a registered sucker for the project
        function isSuckerOf(uint256 projectId, address addr) external view returns (bool);
    }

    /// A sucker bridge endpoint contract
    #[sol(rpc)]
    contract Sucker {
        /// The project this sucker serves
        function projectId() external view returns (uint256);

        /// Outbox state for a terminal token
        function outboxOf(address token) external view returns (OutboxTreeData memory);

        /// Redeem a queued transfer on the destination chain
        function claim(ClaimData calldata claimData) external;
    }

    /// A sucker deployer; the classification probe
    #[sol(rpc)]
    contract SuckerDeployer {
        /// Whether this deployer deployed the given contract
        function isSucker(address sucker) external view returns (bool);
    }

    /// Minimal ERC-20 interface
    #[sol(rpc)]
    contract ERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function decimals() external view returns (uint8);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
