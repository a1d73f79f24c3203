use alloy::sol;

// ENS registry: maps a namehash node to its resolver.
sol! {
    #[sol(rpc)]
    interface IEnsRegistry {
        function resolver(bytes32 node) external view returns (address);
    }
}

// ENSIP-5 text records on a resolver.
sol! {
    #[sol(rpc)]
    interface ITextResolver {
        function text(bytes32 node, string calldata key) external view returns (string memory);
        function setText(bytes32 node, string calldata key, string calldata value) external;
    }
}

// EIP-8004 Identity Registry, only the parts needed to find an agent file.
sol! {
    #[sol(rpc)]
    interface IIdentityRegistry {
        function tokenURI(uint256 tokenId) external view returns (string memory);

        error ERC721NonexistentToken(uint256 tokenId);
    }
}
