//! Bindings for the wrapped-Dingo token contract.

use alloy::sol;

sol! {
    /// The read surface of the token contract the authority consumes, plus
    /// the layout its mint verifier hashes over. Must stay in lockstep with
    /// the deployed contract.
    #[sol(rpc)]
    interface IWrappedDingo {
        /// Mint progress for a minter/deposit-address pair.
        function mintHistory(address minter, string calldata depositAddress)
            external
            view
            returns (uint256 mintNonce, uint256 mintedAmount);

        /// One burn event from the burner's append-only burn history.
        function burnHistory(address burner, uint256 index)
            external
            view
            returns (string memory burnDestination, uint256 burnAmount);

        /// Number of burn events recorded for the burner.
        function burnHistoryLength(address burner) external view returns (uint256);
    }
}
